use crate::types::DependencyGraph;
use sheet_context_chunker::{is_formula, referenced_chunk_ids, sheet_chunk_id, Chunk};

impl DependencyGraph {
    /// Add an edge from each chunk to every id in its `refs`.
    ///
    /// Returns the number of new edges.
    pub fn analyze_chunks<'a, I>(&mut self, chunks: I) -> usize
    where
        I: IntoIterator<Item = &'a Chunk>,
    {
        let mut added = 0;
        for chunk in chunks {
            for target in &chunk.refs {
                if *target == chunk.id {
                    continue;
                }
                match self.add_dependency(&chunk.id, target) {
                    Ok(true) => added += 1,
                    Ok(false) => {}
                    Err(e) => log::debug!("Skipping ref of {}: {e}", chunk.id),
                }
            }
        }
        added
    }

    /// Scan a sheet's formula grid and add `Sheet:<sheet> -> <referenced id>` edges.
    ///
    /// Returns the number of new edges.
    pub fn analyze_formulas_in_sheet(&mut self, sheet_name: &str, formulas: &[Vec<String>]) -> usize {
        let owner = sheet_chunk_id(sheet_name);
        let mut added = 0;

        for formula in formulas.iter().flatten().filter(|f| is_formula(f)) {
            for target in referenced_chunk_ids(sheet_name, formula) {
                match self.add_dependency(&owner, &target) {
                    Ok(true) => added += 1,
                    Ok(false) => {}
                    Err(e) => log::debug!("Skipping reference in '{sheet_name}': {e}"),
                }
            }
        }

        if added > 0 {
            log::debug!("Formula scan of '{sheet_name}' added {added} edges");
        }
        added
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use sheet_context_chunker::{Compressor, SheetState};

    #[test]
    fn test_analyze_formulas() {
        let mut graph = DependencyGraph::new();
        let formulas = vec![
            vec!["=Inputs!A1".to_string(), "=SUM('Cost Data'!A1:B4)".to_string()],
            vec!["=Model!A1".to_string(), "plain".to_string()],
        ];

        assert_eq!(graph.analyze_formulas_in_sheet("Model", &formulas), 3);
        let deps = graph.dependencies_of("Sheet:Model");
        assert!(deps.contains("Sheet:Inputs"));
        assert!(deps.contains("Sheet:Cost Data"));
        assert!(deps.contains("Range:Cost Data!A1:B4"));
        assert_eq!(graph.analyze_formulas_in_sheet("Model", &formulas), 0);
    }

    #[test]
    fn test_analyze_chunks_uses_refs() {
        let sheet = SheetState::new("Report", vec![vec![json!(1)]])
            .with_formulas(vec![vec!["=Budget!B3".to_string()]]);
        let chunk = Compressor::default().compress(Some(&sheet)).unwrap();

        let mut graph = DependencyGraph::new();
        assert_eq!(graph.analyze_chunks([&chunk]), 1);
        assert!(graph.dependents_of("Sheet:Budget").contains("Sheet:Report"));
    }
}
