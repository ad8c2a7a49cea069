use crate::error::{CacheError, Result};
use crate::stats::WorkbookMetrics;
use sheet_context_chunker::{
    range_id_prefix, sheet_chunk_id, Chunk, ChunkKind, RANGE_ID_PREFIX, SHEET_ID_PREFIX,
};
use sheet_context_graph::DependencyGraph;
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// Owns every chunk of one workbook session, plus the depends-on graph
/// that drives invalidation.
#[derive(Debug, Default)]
pub struct MetadataCache {
    chunks: BTreeMap<String, Chunk>,
    graph: DependencyGraph,
}

impl MetadataCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<&Chunk> {
        self.chunks.get(id)
    }

    /// Store a chunk, replacing any chunk with the same id.
    ///
    /// Returns the replaced chunk.
    pub fn set(&mut self, chunk: Chunk) -> Result<Option<Chunk>> {
        check_id_kind(&chunk)?;
        Ok(self.chunks.insert(chunk.id.clone(), chunk))
    }

    pub fn has(&self, id: &str) -> bool {
        self.chunks.contains_key(id)
    }

    /// All chunks, ordered by id
    pub fn get_all(&self) -> Vec<&Chunk> {
        self.chunks.values().collect()
    }

    pub fn get_all_of_kind(&self, kind: ChunkKind) -> Vec<&Chunk> {
        self.chunks.values().filter(|c| c.kind == kind).collect()
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Read access to the dependency graph
    pub const fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    /// Store a chunk and record its dependencies.
    ///
    /// Outgoing edges of a previously stored chunk with the same id are
    /// dropped first, so edits that remove a reference also remove the edge.
    /// Chunks depending on it keep their edges. A chunk rejected by the id
    /// check leaves the graph untouched.
    pub fn add_with_dependency_analysis(&mut self, chunk: Chunk) -> Result<()> {
        check_id_kind(&chunk)?;
        self.graph.clear_dependencies_of(&chunk.id);
        self.graph.analyze_chunks([&chunk]);
        if chunk.is_sheet() {
            if let Some(formulas) = &chunk.payload.formulas {
                self.graph
                    .analyze_formulas_in_sheet(chunk.sheet_name(), formulas);
            }
        }
        self.set(chunk)?;
        Ok(())
    }

    /// Remove the given ids and everything transitively depending on them.
    ///
    /// Returns the chunks actually removed from the store.
    pub fn invalidate<S: AsRef<str>>(&mut self, ids: &[S]) -> Vec<Chunk> {
        let mut doomed: BTreeSet<String> = ids.iter().map(|id| id.as_ref().to_string()).collect();
        doomed.extend(self.graph.transitive_dependents(ids));

        let mut removed = Vec::new();
        for id in &doomed {
            self.graph.remove_all_dependencies_for(id);
            if let Some(chunk) = self.chunks.remove(id) {
                removed.push(chunk);
            }
        }

        log::debug!(
            "Invalidated {} ids ({} cached chunks removed)",
            doomed.len(),
            removed.len()
        );
        removed
    }

    /// Invalidate a sheet's own chunk and every range namespaced under it
    pub fn invalidate_for_sheet(&mut self, sheet_name: &str) -> Vec<Chunk> {
        let prefix = range_id_prefix(sheet_name);
        let mut ids = vec![sheet_chunk_id(sheet_name)];
        ids.extend(
            self.chunks
                .keys()
                .filter(|id| id.starts_with(&prefix))
                .cloned(),
        );
        self.invalidate(&ids)
    }

    /// Drop every chunk and reset the graph
    pub fn invalidate_all(&mut self) {
        self.chunks.clear();
        self.graph.reset();
    }

    /// Seeds plus everything they transitively depend on, limited to cached
    /// chunks. Seeds come first in their given order, then dependencies by id.
    pub fn related_chunks<S: AsRef<str>>(&self, seeds: &[S]) -> Vec<&Chunk> {
        let dependencies = self.graph.transitive_dependencies(seeds);
        let mut seen = HashSet::new();
        let mut related = Vec::new();
        let mut dangling = 0usize;

        let ordered = seeds
            .iter()
            .map(AsRef::as_ref)
            .chain(dependencies.iter().map(String::as_str));
        for id in ordered {
            if !seen.insert(id) {
                continue;
            }
            match self.chunks.get(id) {
                Some(chunk) => related.push(chunk),
                None => dangling += 1,
            }
        }

        if dangling > 0 {
            log::debug!("Dropped {dangling} uncached ids while expanding context");
        }
        related
    }

    /// Sum sheet-chunk metrics into workbook totals
    pub fn aggregate_metrics(&self) -> WorkbookMetrics {
        let mut totals = WorkbookMetrics::new();
        for chunk in self.get_all_of_kind(ChunkKind::Sheet) {
            totals.add_sheet(chunk.metrics());
        }
        totals
    }

    /// Names of sheets with a cached sheet chunk
    pub fn sheet_names(&self) -> Vec<String> {
        self.get_all_of_kind(ChunkKind::Sheet)
            .into_iter()
            .map(|c| c.sheet_name().to_string())
            .collect()
    }
}

fn check_id_kind(chunk: &Chunk) -> Result<()> {
    let prefix = match chunk.kind {
        ChunkKind::Sheet => SHEET_ID_PREFIX,
        ChunkKind::Range => RANGE_ID_PREFIX,
    };
    if chunk.id.starts_with(prefix) {
        Ok(())
    } else {
        Err(CacheError::IdKindMismatch {
            id: chunk.id.clone(),
            kind: chunk.kind.as_str(),
        })
    }
}
