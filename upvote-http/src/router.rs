use std::collections::HashMap;

use crate::Method;

/// Path segment tree. `:name` segments capture a parameter; literal segments
/// always win over parameters at the same depth.
#[derive(Clone)]
struct RadixNode<T> {
    segment: String,
    children: Vec<RadixNode<T>>,
    handlers: HashMap<Method, T>,
    param_name: Option<String>,
}

impl<T: Clone> RadixNode<T> {
    fn new(segment: String, param_name: Option<String>) -> Self {
        RadixNode {
            segment,
            children: Vec::new(),
            handlers: HashMap::new(),
            param_name,
        }
    }

    fn is_param(&self) -> bool {
        self.param_name.is_some()
    }

    fn insert(&mut self, method: Method, parts: &[&str], handler: T) {
        let Some((part, remaining)) = parts.split_first() else {
            self.handlers.insert(method, handler);
            return;
        };

        let param_name = part.strip_prefix(':').map(str::to_string);
        let existing = self.children.iter_mut().find(|child| match &param_name {
            Some(_) => child.is_param(),
            None => !child.is_param() && child.segment == *part,
        });

        match existing {
            Some(child) => child.insert(method, remaining, handler),
            None => {
                let mut child = RadixNode::new(part.to_string(), param_name);
                child.insert(method, remaining, handler);
                self.children.push(child);
            }
        }
    }

    fn search(
        &self,
        method: &Method,
        parts: &[&str],
        params: &mut HashMap<String, String>,
    ) -> Option<T> {
        let Some((part, remaining)) = parts.split_first() else {
            return self.handlers.get(method).cloned();
        };

        for child in self.children.iter().filter(|c| !c.is_param()) {
            if child.segment == *part {
                if let Some(found) = child.search(method, remaining, params) {
                    return Some(found);
                }
            }
        }

        for child in self.children.iter().filter(|c| c.is_param()) {
            if let Some(found) = child.search(method, remaining, params) {
                if let Some(name) = &child.param_name {
                    params.insert(name.clone(), part.to_string());
                }
                return Some(found);
            }
        }

        None
    }
}

pub struct Router<T> {
    root: RadixNode<T>,
}

impl<T: Clone> Router<T> {
    pub fn new() -> Self {
        Router {
            root: RadixNode::new(String::new(), None),
        }
    }

    pub fn add_route(&mut self, method: Method, path: &str, handler: T) {
        let parts = split_path(path);
        self.root.insert(method, &parts, handler);
    }

    pub fn find(&self, method: &Method, path: &str) -> Option<(T, HashMap<String, String>)> {
        let parts = split_path(path);
        let mut params = HashMap::new();
        let handler = self.root.search(method, &parts, &mut params)?;
        Some((handler, params))
    }
}

impl<T: Clone> Default for Router<T> {
    fn default() -> Self {
        Self::new()
    }
}

fn split_path(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}
