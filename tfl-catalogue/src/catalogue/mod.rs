//! Catalogue fetch orchestration.
//!
//! Builds the per-mode line catalogue from the nested TfL endpoints:
//! the collection endpoint lists the lines, then each line needs one
//! route-sequence request per direction, whose payload both carries the
//! attributes merged into the line's route sections and embeds the stop
//! points fed to the shared stop-point index.
//!
//! A run that aborts mid-way persists its partial progress as a
//! checkpoint snapshot, distinct from the canonical one, and the next
//! run resumes from it: lines already in the checkpoint are not fetched
//! again. The canonical snapshot is only ever written by a run that
//! completed every line, so a failed run can never damage it.

use std::collections::HashMap;
use std::path::PathBuf;

use tracing::{debug, info, warn};

use crate::model::{
    Line, LineStub, Mode, ModelError, RouteSection, RouteSequence, StopPoint, parse_line_stubs,
};
use crate::store::{EntityStore, StoreError};
use crate::tfl::{TflError, Transport};

/// A failure inside one step of the fetch: a request, a payload parse,
/// or a store write.
#[derive(Debug, thiserror::Error)]
pub enum FetchStepError {
    #[error(transparent)]
    Transport(#[from] TflError),

    #[error(transparent)]
    Payload(#[from] ModelError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Errors from a catalogue fetch run.
#[derive(Debug, thiserror::Error)]
pub enum CatalogueError {
    /// The collection endpoint itself failed; nothing new was fetched.
    #[error("failed to list lines for mode {mode}: {source}")]
    ListLines {
        mode: Mode,
        #[source]
        source: FetchStepError,
    },

    /// Processing one line failed. A checkpoint holding every line
    /// completed so far has been written; the canonical snapshot is
    /// untouched.
    #[error("failed while processing line {line_id} (checkpoint written): {source}")]
    Line {
        line_id: String,
        #[source]
        source: FetchStepError,
    },

    /// Reading or writing a snapshot failed outside line processing.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Drives the nested fetch for one mode's catalogue.
///
/// Requests go out strictly one at a time, in collection order, through
/// whatever [`Transport`] is injected; wrap the HTTP client in
/// [`crate::tfl::RateLimited`] before constructing a fetcher.
pub struct CatalogueFetcher<T> {
    transport: T,
    mode: Mode,
    data_dir: PathBuf,
}

impl<T: Transport> CatalogueFetcher<T> {
    pub fn new(transport: T, mode: Mode, data_dir: impl Into<PathBuf>) -> Self {
        Self {
            transport,
            mode,
            data_dir: data_dir.into(),
        }
    }

    /// Path of the canonical per-mode snapshot.
    pub fn snapshot_path(&self) -> PathBuf {
        self.data_dir.join(format!("lines-{}.json", self.mode))
    }

    /// Path of the transient checkpoint written by an aborted run.
    pub fn checkpoint_path(&self) -> PathBuf {
        self.data_dir
            .join(format!("lines-{}.checkpoint.json", self.mode))
    }

    /// Open the canonical line store for this fetcher's mode. Nothing is
    /// loaded yet.
    pub fn store(&self) -> EntityStore<Line> {
        EntityStore::new(self.snapshot_path())
    }

    /// Fetch the full catalogue for the mode.
    ///
    /// Resumes from a checkpoint left by an earlier aborted run. On any
    /// error while processing a line, writes a fresh checkpoint and
    /// returns the error; on success writes the canonical snapshot,
    /// removes the checkpoint and returns the completed mapping.
    ///
    /// Discovered stop points are registered with `stop_points` as each
    /// sequence arrives, before its attributes are merged, so even a
    /// failed run keeps every stop point it saw.
    pub async fn fetch(
        &self,
        stop_points: &mut EntityStore<StopPoint>,
    ) -> Result<HashMap<String, Line>, CatalogueError> {
        let mut checkpoint = EntityStore::<Line>::new(self.checkpoint_path());
        let resumed = checkpoint.load()?;
        let mut lines: HashMap<String, Line> = checkpoint.data().clone();
        if resumed {
            info!(
                mode = %self.mode,
                completed = lines.len(),
                "resuming from checkpoint"
            );
        }

        let endpoint = format!(
            "/Line/Mode/{}/Route?serviceTypes=Regular,Night",
            self.mode
        );
        let stubs = match self.list_lines(&endpoint).await {
            Ok(stubs) => stubs,
            Err(source) => {
                // Nothing accumulated beyond what the checkpoint already
                // holds, so leave it as it is.
                return Err(CatalogueError::ListLines {
                    mode: self.mode,
                    source,
                });
            }
        };
        info!(mode = %self.mode, lines = stubs.len(), "listed lines");

        for stub in stubs {
            if lines.contains_key(&stub.id) {
                continue;
            }

            let id = stub.id.clone();
            match self.fetch_line(stub, stop_points).await {
                Ok(line) => {
                    debug!(line = %id, sections = line.route_sections.len(), "fetched line");
                    lines.insert(line.id.clone(), line);
                }
                Err(source) => {
                    warn!(line = %id, completed = lines.len(), "aborting run, writing checkpoint");
                    checkpoint.replace(lines);
                    checkpoint.save()?;
                    return Err(CatalogueError::Line {
                        line_id: id,
                        source,
                    });
                }
            }
        }

        let mut store = self.store();
        store.replace(lines);
        store.save()?;
        self.remove_checkpoint()?;
        info!(mode = %self.mode, lines = store.len(), "catalogue complete");

        Ok(store.data().clone())
    }

    async fn list_lines(&self, endpoint: &str) -> Result<Vec<LineStub>, FetchStepError> {
        let body = self.transport.get(endpoint).await?;
        Ok(parse_line_stubs(&body)?)
    }

    /// Fetch the per-direction sequences for one line and merge them into
    /// its route sections. Each line is attempted at most once per run.
    async fn fetch_line(
        &self,
        stub: LineStub,
        stop_points: &mut EntityStore<StopPoint>,
    ) -> Result<Line, FetchStepError> {
        let mut sections = Vec::with_capacity(stub.route_sections.len());

        for section in &stub.route_sections {
            let endpoint = format!("/Line/{}/Route/Sequence/{}", stub.id, section.direction);
            let body = self.transport.get(&endpoint).await?;
            let sequence = RouteSequence::parse(&body)?;

            // Register discovered stops before merging, so an abort later
            // in this line still keeps them.
            let inserted = stop_points.add_if_absent(sequence.stop_points.iter().cloned())?;
            if inserted > 0 {
                debug!(line = %stub.id, inserted, "registered new stop points");
            }

            sections.push(RouteSection::merge(section.clone(), &sequence));
        }

        Ok(Line::from_parts(stub, sections)?)
    }

    /// Remove the checkpoint after a completed run. Missing file is fine.
    fn remove_checkpoint(&self) -> Result<(), CatalogueError> {
        let path = self.checkpoint_path();
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(CatalogueError::Store(StoreError::Write { path, source })),
        }
    }
}
