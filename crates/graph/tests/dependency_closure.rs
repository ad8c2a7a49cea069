use pretty_assertions::assert_eq;
use sheet_context_graph::DependencyGraph;
use std::collections::BTreeSet;

fn ids(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

fn workbook_graph() -> DependencyGraph {
    let mut graph = DependencyGraph::new();
    graph.analyze_formulas_in_sheet("Summary", &[vec!["=Forecast!B2*1.1".to_string()]]);
    graph.analyze_formulas_in_sheet("Forecast", &[vec!["=SUM(Actuals!A1:A12)".to_string()]]);
    graph.analyze_formulas_in_sheet("Actuals", &[vec!["=Rates!C3".to_string()]]);
    graph.analyze_formulas_in_sheet("Notes", &[vec!["=Archive!A1".to_string()]]);
    graph
}

#[test]
fn chain_closure_in_both_directions() {
    let graph = workbook_graph();

    assert_eq!(
        graph.transitive_dependencies(&["Sheet:Summary"]),
        ids(&[
            "Sheet:Forecast",
            "Sheet:Actuals",
            "Range:Actuals!A1:A12",
            "Sheet:Rates",
        ])
    );
    assert_eq!(
        graph.transitive_dependents(&["Sheet:Rates"]),
        ids(&["Sheet:Actuals", "Sheet:Forecast", "Sheet:Summary"])
    );
}

#[test]
fn unrelated_sheets_excluded() {
    let graph = workbook_graph();
    let related = graph.all_related(&["Sheet:Forecast"]);
    assert!(!related.contains("Sheet:Notes"));
    assert!(!related.contains("Sheet:Archive"));
    assert!(related.contains("Sheet:Summary"));
    assert!(related.contains("Sheet:Rates"));
}

#[test]
fn circular_workbook_references_terminate() {
    let mut graph = DependencyGraph::new();
    graph.analyze_formulas_in_sheet("A", &[vec!["=B!A1".to_string()]]);
    graph.analyze_formulas_in_sheet("B", &[vec!["=A!A1".to_string()]]);

    assert_eq!(graph.transitive_dependencies(&["Sheet:A"]), ids(&["Sheet:B"]));
    assert_eq!(graph.all_related(&["Sheet:A"]), ids(&["Sheet:B"]));
}

#[test]
fn edge_removal_is_local() {
    let mut graph = workbook_graph();
    assert!(graph.remove_dependency("Sheet:Forecast", "Sheet:Actuals"));

    assert_eq!(
        graph.dependencies_of("Sheet:Forecast"),
        ids(&["Range:Actuals!A1:A12"])
    );
    assert_eq!(graph.dependencies_of("Sheet:Actuals"), ids(&["Sheet:Rates"]));
    assert_eq!(graph.dependencies_of("Sheet:Notes"), ids(&["Sheet:Archive"]));
}
