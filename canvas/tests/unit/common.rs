//! Shared fixtures

use std::sync::Arc;

use axum::Router;
use civic_canvas::filesys::dir::Dir;
use civic_canvas::graph::store::GraphStore;
use civic_canvas::models::library::create_node;
use tokio::net::TcpListener;
use tokio::sync::RwLock;

/// Build a store holding nodes with fixed ids
pub fn store_with(nodes: &[(&str, &str)]) -> GraphStore {
    let mut store = GraphStore::new("Test Workflow");
    for (id, node_type) in nodes {
        let mut node = create_node(node_type, 0.0, 0.0);
        node.id = id.to_string();
        store.add_node(node).unwrap();
    }
    store
}

pub fn shared(store: GraphStore) -> Arc<RwLock<GraphStore>> {
    Arc::new(RwLock::new(store))
}

pub async fn temp_dir() -> Dir {
    Dir::create_temp_dir("civic-canvas-test").await.unwrap()
}

/// Serve a fake backend on an ephemeral port and return its API base URL
pub async fn spawn_backend(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}/api/v1", addr)
}
