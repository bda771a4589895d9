use chrono::{DateTime, Utc};

/// Top-level sections and their subsections for a new document.
const SECTIONS: &[(&str, &[&str])] = &[
    (
        "Vision, Strategy & Business",
        &[
            "Mission & Vision",
            "Target Users",
            "Value Proposition",
            "Market & Competition",
            "Business Model",
        ],
    ),
    (
        "Product Requirements",
        &[
            "Users & Personas",
            "Use Cases & Scenarios",
            "Features & Requirements",
            "Non-Functional Requirements",
            "Success Metrics",
        ],
    ),
    (
        "Architecture & System Design",
        &[
            "Architecture Overview",
            "Client Architecture",
            "Server Architecture",
            "Data Model & Storage",
            "Integrations & External APIs",
        ],
    ),
    (
        "Implementation Notes",
        &[
            "Tech Stack",
            "Coding Standards",
            "Folder Structure",
            "Development Workflow",
        ],
    ),
    (
        "AI, Data & Analytics",
        &[
            "AI Features",
            "Data Collection & Analytics",
            "Privacy, Ethics & Safety",
        ],
    ),
    (
        "Design, UX & Content",
        &["UX Principles", "Visual Style", "Content Strategy"],
    ),
    (
        "Tasks, Backlog & Roadmap",
        &["Immediate Tasks", "Short-Term Roadmap", "Long-Term Roadmap"],
    ),
];

/// Markdown skeleton for a fresh document: a project meta block followed by
/// numbered sections, each subsection holding a TBD placeholder.
pub fn render(project_name: &str, description: Option<&str>, now: DateTime<Utc>) -> String {
    let mut out = String::new();
    out.push_str(&format!("# 0. Project Meta\n\n## Project Name\n{project_name}\n\n"));
    out.push_str(&format!(
        "## Project Description\n{}\n\n",
        description.unwrap_or("TBD")
    ));
    out.push_str(&format!(
        "## Automation Metadata\n- Created: {}\n- Tool: prd\n\n",
        now.format("%Y-%m-%d %H:%M:%S UTC")
    ));

    for (n, (section, subsections)) in SECTIONS.iter().enumerate() {
        let n = n + 1;
        out.push_str(&format!("# {n}. {section}\n\n"));
        for (m, sub) in subsections.iter().enumerate() {
            out.push_str(&format!("## {n}.{} {sub}\n- TBD\n\n", m + 1));
        }
    }

    let log = SECTIONS.len() + 1;
    out.push_str(&format!(
        "# {log}. Progress Log\n\n## {log}.1 Automation Log\n- Initial skeleton created.\n"
    ));
    out
}
