//! Plain-text rendering of picker items.

use tether_search::item::{Field, ItemView};
use tether_search::Span;

/// Field text with matched parts wrapped in brackets.
pub fn marked(field: &Field) -> String {
    field
        .spans()
        .map(|s| match s {
            Span::Plain(t) => t.to_string(),
            Span::Highlighted(t) => format!("[{}]", t),
        })
        .collect()
}

pub fn item_lines(view: &ItemView) -> Vec<String> {
    let mut head = format!("{} {}", view.action, marked(&view.title));
    if let Some(cluster) = &view.cluster_name {
        head.push_str(&format!("  ({})", cluster));
    }
    let mut out = vec![head];
    if !view.details.is_empty() {
        out.push(format!("    {}", view.details.iter().map(marked).collect::<Vec<_>>().join(" · ")));
    }
    if !view.labels.is_empty() {
        let labels: Vec<String> = view.labels.iter().map(|l| format!("{}: {}", marked(&l.name), marked(&l.value))).collect();
        out.push(format!("    {}", labels.join(", ")));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(text: &str, kws: &[&str]) -> Field { Field { text: text.into(), keywords: kws.iter().map(|s| s.to_string()).collect() } }

    #[test]
    fn brackets_every_match() {
        assert_eq!(marked(&field("db.example.com", &["example"])), "db.[example].com");
        assert_eq!(marked(&field("Prod-prod", &["prod"])), "[Prod]-[prod]");
        assert_eq!(marked(&field("plain", &[])), "plain");
    }

    #[test]
    fn item_layout() {
        let view = ItemView {
            action: "Log in to Kubernetes cluster",
            title: field("prod-eu", &["prod"]),
            cluster_name: Some("root".into()),
            details: Vec::new(),
            labels: vec![tether_search::item::LabelView { name: field("region", &[]), value: field("eu-west-1", &["eu"]) }],
        };
        assert_eq!(item_lines(&view), vec!["Log in to Kubernetes cluster [prod]-eu  (root)", "    region: [eu]-west-1"]);
    }
}
