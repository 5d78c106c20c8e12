//! Prompt templates offered in the template picker.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptTemplate {
    pub id: String,
    pub category: String,
    pub title: String,
    pub template: String,
    #[serde(default)]
    pub icon: String,
}

impl PromptTemplate {
    fn builtin(id: &str, category: &str, title: &str, template: &str, icon: &str) -> Self {
        Self {
            id: id.to_string(),
            category: category.to_string(),
            title: title.to_string(),
            template: template.to_string(),
            icon: icon.to_string(),
        }
    }
}

/// Templates shipped with the client, used when the backend has none.
pub fn builtin_templates() -> Vec<PromptTemplate> {
    [
        (
            "custom-1",
            "Productivity",
            "Summarize this text",
            "Please summarize the following text in a concise way:",
            "fas fa-align-left",
        ),
        (
            "custom-2",
            "Learning",
            "Explain this concept simply",
            "Explain the following concept in simple terms for a beginner:",
            "fas fa-graduation-cap",
        ),
        (
            "default-1",
            "Code Analysis",
            "Analyze this code for optimization opportunities",
            "Please analyze the following code for optimization opportunities, focusing on performance, memory usage, and algorithmic efficiency. Provide specific suggestions with examples:",
            "fas fa-code",
        ),
        (
            "default-2",
            "Code Analysis",
            "Explain the security implications of this function",
            "Review the following code for security vulnerabilities and explain potential risks. Include recommendations for secure coding practices:",
            "fas fa-shield-alt",
        ),
        (
            "default-3",
            "Code Analysis",
            "Review code for best practices and conventions",
            "Please review this code for adherence to best practices, coding conventions, and maintainability. Suggest improvements for readability and structure:",
            "fas fa-check-circle",
        ),
        (
            "default-4",
            "Problem Solving",
            "Break down this complex problem step by step",
            "Help me break down this complex problem into smaller, manageable steps. Provide a systematic approach to solving:",
            "fas fa-puzzle-piece",
        ),
        (
            "default-5",
            "Problem Solving",
            "What are alternative solutions to this issue?",
            "Analyze this problem and suggest multiple alternative solutions. Compare the pros and cons of each approach:",
            "fas fa-lightbulb",
        ),
        (
            "default-6",
            "Documentation",
            "Generate comprehensive documentation for this code",
            "Create comprehensive documentation for the following code, including function descriptions, parameter explanations, return values, and usage examples:",
            "fas fa-file-alt",
        ),
        (
            "default-7",
            "Documentation",
            "Create API documentation with examples",
            "Generate API documentation for this code including endpoint descriptions, request/response formats, authentication requirements, and practical examples:",
            "fas fa-book",
        ),
    ]
    .into_iter()
    .map(|(id, category, title, template, icon)| {
        PromptTemplate::builtin(id, category, title, template, icon)
    })
    .collect()
}

/// Groups templates by category, keeping categories in first-seen order.
pub fn group_by_category(templates: &[PromptTemplate]) -> Vec<(&str, Vec<&PromptTemplate>)> {
    let mut groups: Vec<(&str, Vec<&PromptTemplate>)> = Vec::new();
    for template in templates {
        match groups
            .iter_mut()
            .find(|(category, _)| *category == template.category)
        {
            Some((_, members)) => members.push(template),
            None => groups.push((template.category.as_str(), vec![template])),
        }
    }
    groups
}
