//! Codag Core: workflow graph model, clustering and diff engine

pub mod diff;
pub mod facts;
pub mod graph;
pub mod merge;
pub mod model;
pub mod symbols;
pub mod workflow;


pub use diff::{ChangeSet, GraphDiff, compute_graph_diff, has_diff};
pub use facts::{
    CallSite, CalleeRef, CallerRef, CrossFileCall, FunctionDef, HttpClientCall, HttpConnection,
    HttpRouteHandler, ImportRecord, ImportedName, Language, MatchConfidence, RouteSource, receiver,
    simple_name,
};
pub use graph::WorkflowGraph;
pub use model::{
    CACHE_FORMAT_VERSION, GraphSnapshot, NodeKind, SourceLocation, WorkflowComponent, WorkflowEdge,
    WorkflowGroup, WorkflowHint, WorkflowNode,
};
pub use symbols::{FunctionRef, SymbolTable};
pub use workflow::{Detection, WorkflowDetector};
