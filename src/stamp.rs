// Copyright (c) 2022 Jason White
//
// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to deal
// in the Software without restriction, including without limitation the rights
// to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
// copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in
// all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN
// THE SOFTWARE.

//! Checks whether a package has already been built, so that re-running the
//! driver against a partially-built tree doesn't redo finished work.
//!
//! A package is considered already built if `<build_dir>/<name>-<version>/
//! .stamp_installed` exists. This is the same convention the underlying
//! build system uses for its own per-package stamp files.

use std::path::PathBuf;

use crate::config::Config;
use crate::graph::Node;

const STAMP_FILE_NAME: &str = ".stamp_installed";

/// Returns `true` if `node`'s stamp file is already present under
/// `config.build_dir`.
pub fn already_built(config: &Config, node: &Node) -> bool {
    stamp_path(config, node).is_file()
}

fn stamp_path(config: &Config, node: &Node) -> PathBuf {
    config
        .build_dir
        .join(node.build_dir_name())
        .join(STAMP_FILE_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DebugModule;
    use crate::edge::Edge;
    use crate::graph::Graph;

    fn test_config(build_dir: PathBuf, config_dir: PathBuf) -> Config {
        Config {
            build_dir,
            config_dir,
            br2_external: String::new(),
            cpu_num: 1,
            designated_priority_package: None,
            finalize_targets: Vec::new(),
            retry_missing_rule: false,
            debug_level: 0,
            debug_module: DebugModule::None,
        }
    }

    #[test]
    fn missing_stamp_is_not_built() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path().to_path_buf(), dir.path().to_path_buf());

        let edges = vec![Edge {
            name: "busybox".to_string(),
            version: "1.0".to_string(),
            parents: Vec::new(),
        }];
        let graph = Graph::build(&edges).unwrap();
        let id = graph.node_id("busybox").unwrap();

        assert!(!already_built(&config, graph.node(id)));
    }

    #[test]
    fn present_stamp_is_built() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path().to_path_buf(), dir.path().to_path_buf());

        let edges = vec![Edge {
            name: "busybox".to_string(),
            version: "1.0".to_string(),
            parents: Vec::new(),
        }];
        let graph = Graph::build(&edges).unwrap();
        let id = graph.node_id("busybox").unwrap();

        let pkg_dir = dir.path().join("busybox-1.0");
        std::fs::create_dir_all(&pkg_dir).unwrap();
        std::fs::write(pkg_dir.join(STAMP_FILE_NAME), b"").unwrap();

        assert!(already_built(&config, graph.node(id)));
    }

    #[test]
    fn unversioned_package_uses_bare_name() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path().to_path_buf(), dir.path().to_path_buf());

        let edges = vec![Edge {
            name: "rootfs-overlay".to_string(),
            version: String::new(),
            parents: Vec::new(),
        }];
        let graph = Graph::build(&edges).unwrap();
        let id = graph.node_id("rootfs-overlay").unwrap();

        let pkg_dir = dir.path().join("rootfs-overlay");
        std::fs::create_dir_all(&pkg_dir).unwrap();
        std::fs::write(pkg_dir.join(STAMP_FILE_NAME), b"").unwrap();

        assert!(already_built(&config, graph.node(id)));
    }
}
