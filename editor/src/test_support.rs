//! Test utilities for the editor crate.
//!
//! Shared helpers for unit tests (in `src/`) and integration tests (in
//! `tests/`). Compiled for tests and behind the `test-support` feature.

use crate::domain::{Node, OsmElement, Tags, Way};

/// Build a tag map from string pairs.
pub fn tags(pairs: &[(&str, &str)]) -> Tags {
    pairs
        .iter()
        .map(|(key, value)| ((*key).to_owned(), (*value).to_owned()))
        .collect()
}

/// Build a node element.
pub fn node(id: i64, lon: f64, lat: f64, pairs: &[(&str, &str)]) -> OsmElement {
    OsmElement::Node(Node {
        id,
        lat,
        lon,
        tags: tags(pairs),
    })
}

/// Build an untagged way element.
pub fn way(id: i64, nodes: &[i64]) -> OsmElement {
    OsmElement::Way(Way {
        id,
        nodes: nodes.to_vec(),
        tags: Tags::new(),
    })
}

pub mod cap_fs {
    //! Capability-scoped filesystem helpers for tests.

    use std::ffi::OsString;
    use std::io;
    use std::path::Path;

    use cap_std::{ambient_authority, fs::Dir};
    use tempfile::TempDir;

    /// Fresh scratch directory removed on drop.
    pub fn scratch_dir() -> io::Result<TempDir> {
        tempfile::Builder::new().prefix("osm-gtfs-").tempdir()
    }

    /// Read a UTF-8 text file through `cap_std`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use osm_gtfs_editor::outbound::changeset_file::write_changeset;
    /// use osm_gtfs_editor::test_support::cap_fs::{read_file_to_string, scratch_dir};
    ///
    /// let scratch = scratch_dir()?;
    /// let path = write_changeset(scratch.path(), "<osm/>\n")?;
    /// assert_eq!(read_file_to_string(&path)?, "<osm/>\n");
    /// # Ok::<(), std::io::Error>(())
    /// ```
    pub fn read_file_to_string(path: &Path) -> io::Result<String> {
        let (parent, file_name) = parent_and_file_name(path)?;
        let directory = Dir::open_ambient_dir(parent, ambient_authority())?;
        directory.read_to_string(Path::new(&file_name))
    }

    /// Return true when `path` exists.
    pub fn path_exists(path: &Path) -> bool {
        let Ok((parent, file_name)) = parent_and_file_name(path) else {
            return false;
        };
        let Ok(directory) = Dir::open_ambient_dir(parent, ambient_authority()) else {
            return false;
        };
        directory.exists(Path::new(&file_name))
    }

    fn parent_and_file_name(path: &Path) -> io::Result<(&Path, OsString)> {
        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        let file_name = path.file_name().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                "path must include a file or directory name",
            )
        })?;
        Ok((parent, file_name.to_os_string()))
    }
}

pub mod sources {
    //! Scripted and recording upstream doubles.

    use std::collections::{BTreeMap, VecDeque};
    use std::sync::{Mutex, MutexGuard};

    use async_trait::async_trait;

    use crate::domain::ports::{
        ElementBatch, ElementSourceError, OsmApiSource, OverpassQuery, OverpassSource,
    };
    use crate::domain::{ElementKey, ElementType, OsmElement};

    fn lock<'a, T>(mutex: &'a Mutex<T>, name: &str) -> MutexGuard<'a, T> {
        match mutex.lock() {
            Ok(guard) => guard,
            Err(_) => panic!("{name} mutex poisoned"),
        }
    }

    /// Overpass double replaying scripted responses in order.
    ///
    /// Once the script is exhausted every query returns an empty batch.
    #[derive(Default)]
    pub struct ScriptedOverpassSource {
        responses: Mutex<VecDeque<Result<ElementBatch, ElementSourceError>>>,
        queries: Mutex<Vec<String>>,
    }

    impl ScriptedOverpassSource {
        /// Double replaying `responses`.
        pub fn new(
            responses: impl IntoIterator<Item = Result<ElementBatch, ElementSourceError>>,
        ) -> Self {
            Self {
                responses: Mutex::new(responses.into_iter().collect()),
                queries: Mutex::new(Vec::new()),
            }
        }

        /// Query texts received so far.
        pub fn queries(&self) -> Vec<String> {
            lock(&self.queries, "query log").clone()
        }

        /// Number of queries received.
        pub fn call_count(&self) -> usize {
            lock(&self.queries, "query log").len()
        }
    }

    #[async_trait]
    impl OverpassSource for ScriptedOverpassSource {
        async fn run_query(
            &self,
            query: &OverpassQuery,
        ) -> Result<ElementBatch, ElementSourceError> {
            lock(&self.queries, "query log").push(query.query.clone());
            lock(&self.responses, "response script")
                .pop_front()
                .unwrap_or_else(|| Ok(ElementBatch::default()))
        }
    }

    /// OSM API double serving elements from a fixed pool.
    ///
    /// Ids missing from the pool are absent from the response. The live API
    /// returns deleted elements as `visible: false` stubs, which the HTTP
    /// adapter drops while decoding, so callers see the same shape.
    #[derive(Default)]
    pub struct RecordingOsmApiSource {
        pool: BTreeMap<ElementKey, OsmElement>,
        requests: Mutex<Vec<(ElementType, Vec<i64>)>>,
    }

    impl RecordingOsmApiSource {
        /// Double serving `elements`.
        pub fn new(elements: impl IntoIterator<Item = OsmElement>) -> Self {
            Self {
                pool: elements
                    .into_iter()
                    .map(|element| (element.key(), element))
                    .collect(),
                requests: Mutex::new(Vec::new()),
            }
        }

        /// Requests received so far, in order.
        pub fn requests(&self) -> Vec<(ElementType, Vec<i64>)> {
            lock(&self.requests, "request log").clone()
        }

        fn serve(&self, element_type: ElementType, ids: &[i64]) -> ElementBatch {
            lock(&self.requests, "request log").push((element_type, ids.to_vec()));
            ElementBatch::from_elements(
                ids.iter()
                    .filter_map(|id| self.pool.get(&ElementKey::new(element_type, *id)))
                    .cloned()
                    .collect(),
            )
        }
    }

    #[async_trait]
    impl OsmApiSource for RecordingOsmApiSource {
        async fn fetch_nodes(&self, ids: &[i64]) -> Result<ElementBatch, ElementSourceError> {
            Ok(self.serve(ElementType::Node, ids))
        }

        async fn fetch_ways(&self, ids: &[i64]) -> Result<ElementBatch, ElementSourceError> {
            Ok(self.serve(ElementType::Way, ids))
        }
    }
}
