//! Adapters compiled into the server.

pub mod echo;
pub mod http_proxy;
pub mod keyword;

pub use echo::EchoAdapter;
pub use http_proxy::HttpProxyAdapter;
pub use keyword::KeywordAdapter;

use super::contract::ModelAdapter;
use super::loader::AdapterFactory;

fn echo() -> Box<dyn ModelAdapter> {
    Box::new(EchoAdapter::new())
}

fn keyword() -> Box<dyn ModelAdapter> {
    Box::new(KeywordAdapter::new())
}

fn http_proxy() -> Box<dyn ModelAdapter> {
    Box::new(HttpProxyAdapter::new())
}

/// Identifier and factory of every built-in adapter.
pub fn builtin_adapters() -> Vec<(&'static str, AdapterFactory)> {
    vec![
        ("echo", echo as AdapterFactory),
        ("keyword", keyword as AdapterFactory),
        ("http_proxy", http_proxy as AdapterFactory),
    ]
}
