//! HTML views rendered with maud.

use churn_data::{ChurnLabel, ChurnModel, FieldError, FieldKind, FieldSpec, Prediction};
use maud::{DOCTYPE, Markup, PreEscaped, html};

const STYLE: &str = "
body { margin: 0; font-family: Helvetica, Arial, sans-serif; display: flex; min-height: 100vh; }
nav { width: 200px; background: #f0f2f6; padding: 24px 16px; }
nav h2 { margin-top: 0; }
nav a { display: block; padding: 6px 8px; color: #262730; text-decoration: none; border-radius: 4px; }
nav a.active { background: #dfe3eb; font-weight: bold; }
main { flex: 1; padding: 24px 40px; }
.grid { display: grid; grid-template-columns: repeat(3, 1fr); gap: 24px; }
.field { margin-bottom: 16px; }
.field label { display: block; font-weight: bold; margin-bottom: 4px; }
.field input, .field select { width: 100%; padding: 6px; box-sizing: border-box; }
.field small { color: #6b6f76; }
.field .error { color: #c62828; display: block; }
button { width: 100%; padding: 10px; font-size: 16px; margin-top: 8px; }
.verdict { text-align: center; font-size: 28px; font-weight: bold; margin: 24px 0 4px; }
.verdict.churn { color: #c62828; }
.verdict.not-churn { color: #2e7d32; }
.probability { text-align: center; color: #6b6f76; }
.tree { overflow: auto; border: 1px solid #dfe3eb; }
footer { text-align: center; color: #6b6f76; margin-top: 48px; }
";

/// Which page the sidebar marks as active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    /// The prediction form.
    Input,
    /// The tree drawing.
    Visualisasi,
}

fn layout(page: Page, content: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                title { "Customer Churn Prediction" }
                style { (PreEscaped(STYLE)) }
            }
            body {
                nav {
                    h2 { "CART" }
                    a href="/input" class=[(page == Page::Input).then_some("active")] { "Input" }
                    a href="/visualisasi" class=[(page == Page::Visualisasi).then_some("active")] {
                        "Visualisasi"
                    }
                }
                main { (content) }
            }
        }
    }
}

/// Submitted values and problems to show back in the form.
#[derive(Debug, Default)]
pub struct FormState<'a> {
    /// Raw values in schema order; empty for a fresh form.
    pub values: &'a [Option<String>],
    /// Per-field problems from the last submission.
    pub errors: &'a [FieldError],
    /// Verdict from the last valid submission.
    pub prediction: Option<&'a Prediction>,
}

fn field_input(
    index: usize,
    field: &FieldSpec,
    model: &ChurnModel,
    state: &FormState<'_>,
) -> Markup {
    let name = format!("f{index}");
    let value = state
        .values
        .get(index)
        .and_then(Option::as_deref)
        .unwrap_or("");
    let error = state.errors.iter().find(|e| e.index == index);
    let categories = model.encoders().get(index).and_then(Option::as_ref);

    html! {
        div.field {
            label for=(name) { (field.label) }
            @if let Some(encoder) = categories {
                select id=(name) name=(name) {
                    option value="" selected[value.is_empty()] { "Choose..." }
                    @for category in encoder.categories() {
                        option value=(category) selected[category == value] { (category) }
                    }
                }
            } @else {
                @match &field.kind {
                    FieldKind::Choice(options) => {
                        select id=(name) name=(name) {
                            option value="" selected[value.is_empty()] { "Choose..." }
                            @for choice in options {
                                @let v = choice.value.to_string();
                                option value=(v) selected[v == value] { (choice.label) }
                            }
                        }
                    }
                    FieldKind::Count => {
                        input id=(name) name=(name) type="number" min="0" step="1"
                            value=(value) placeholder=(field.hint);
                    }
                    FieldKind::Amount => {
                        input id=(name) name=(name) type="number" min="0" step="any"
                            value=(value) placeholder=(field.hint);
                    }
                }
            }
            @if let Some(error) = error {
                span.error { (error.error.to_string()) }
            } @else {
                small { (field.hint) }
            }
        }
    }
}

fn verdict(prediction: &Prediction) -> Markup {
    let class = match prediction.label {
        ChurnLabel::Churn => "verdict churn",
        ChurnLabel::NotChurn => "verdict not-churn",
    };
    html! {
        p class=(class) { (prediction.label.to_string()) }
        p.probability { "probability " (format!("{:.2}", prediction.probability)) }
    }
}

/// The prediction form, optionally with a verdict or field errors.
#[must_use]
pub fn input_page(model: &ChurnModel, state: &FormState<'_>) -> Markup {
    let fields = model.schema().fields();
    let per_column = fields.len().div_ceil(3).max(1);

    layout(
        Page::Input,
        html! {
            h1 { "Customer Churn Prediction Using CART" }
            p {
                "Predicts whether a customer is likely to churn from their usage data. "
                "Fill in every field and press " strong { "Predict" } "."
            }
            hr;
            h2 { "Customer Data" }
            form method="post" action="/predict" {
                div.grid {
                    @for (chunk_index, chunk) in fields.chunks(per_column).enumerate() {
                        div.column {
                            @for (offset, field) in chunk.iter().enumerate() {
                                (field_input(chunk_index * per_column + offset, field, model, state))
                            }
                        }
                    }
                }
                button type="submit" { "Predict" }
            }
            @if !state.errors.is_empty() {
                p.error { "Please correct the highlighted fields." }
            }
            @if let Some(prediction) = state.prediction {
                (verdict(prediction))
            }
            footer {
                hr;
                p {
                    "Decision tree: " (model.tree().n_nodes()) " nodes, depth "
                    (model.tree().depth()) ", holdout accuracy "
                    (format!("{:.2}", model.holdout_accuracy()))
                }
            }
        },
    )
}

/// The tree drawing page.
#[must_use]
pub fn visualisasi_page(model: &ChurnModel, tree_svg: &str) -> Markup {
    layout(
        Page::Visualisasi,
        html! {
            h1 { "Decision Tree" }
            p {
                "Each box shows the split condition, impurity, sample count, class counts, "
                "and majority class. Samples satisfying the condition go left."
            }
            p {
                (model.tree().n_nodes()) " nodes, " (model.tree().n_leaves()) " leaves, depth "
                (model.tree().depth()) ". "
                a href="/tree.svg" { "Open SVG" }
            }
            div.tree { (PreEscaped(tree_svg)) }
        },
    )
}
