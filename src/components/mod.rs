pub mod kb_graph;
