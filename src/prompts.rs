//! Prompt construction for Statement of Intent generation.
//!
//! The prompt has three parts: instructions for the model, the student's raw
//! responses as JSON, and a sectioned template whose bracketed slots name the
//! question ids that feed them.

use crate::error::PromptError;
use crate::questionnaire::ResponseMap;

/// Turns a response map into the text sent to the generation service.
pub trait PromptBuilder {
    fn build(&self, responses: &ResponseMap) -> Result<String, PromptError>;
}

/// Builds the NESA Stage 6 Industrial Technology Multimedia Statement of
/// Intent prompt.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatementPromptBuilder;

const HEADER: &str = "# NESA Stage 6 Industrial Technology Multimedia - Statement of Intent Generation";

const INSTRUCTIONS: &str = "\
## Instructions for AI Assistant

You are an assistant for the NESA Stage 6 Industrial Technology Multimedia Major \
Project. Write a complete, Band 6 quality Statement of Intent from the student \
responses below, filling in the template that follows them.

Guidelines:
1. **Content elevation:** where a response is vague or generic, rephrase and expand \
it with the depth and justification expected at Band 6. Reframe commercial goals \
(store launches, view counts) as product-centric, measurable objectives.
2. **Voice:** write as a highly technical Year 12 student. Prefer direct vocabulary, \
short sentences and active voice. Keep an enthusiastic, confident, professional tone.
3. **Technical terms:** keep software, hardware and technique names exact and \
formatted consistently (e.g. `Python`, `Blender`, `Raspberry Pi`).
4. **Spelling:** use Australian English throughout (-ise, colour, favourite).
5. **Coherence:** connect the problem statement to the solution, objectives and \
success criteria.
6. **Structure:** keep the section structure and numbering exactly as given.
7. **Placeholders:** if information is missing and cannot reasonably be inferred, \
leave a bracketed placeholder `[ ]` for the student to complete.
8. **Formatting:** use Markdown headings and bold emphasis.";

/// Template sections: heading, then body lines. `{q1}`-style slots refer the
/// model back to the matching response.
const SECTIONS: &[(&str, &[&str])] = &[
    (
        "# Statement of Intent: [Project Title - from `q1`]",
        &[],
    ),
    (
        "## 1.1 Introduction: Defining the Project and its Purpose",
        &[
            "For my Industrial Technology Multimedia Major Project, I'm going to design and build [multimedia product type - from `q2`, made specific].",
            "This project exists because [problem or opportunity - from `q3`, reframed as a genuine user need or gap].",
            "My project will focus on [core content or subject matter - from `q5`].",
        ],
    ),
    (
        "## 1.2 Rationale: Why This Project? Why This Approach?",
        &[
            "I chose this project because [personal interest - from `q5`, linked to academic or industry relevance].",
            "A [product type - from `q2`] is the best medium because [justification - from `q6`].",
            "This project lets me develop [2-3 specific techniques - from `q7`].",
        ],
    ),
    (
        "## 1.3 Target Audience: Who is this Project For, and Why?",
        &[
            "The main audience for '[Project Title]' is [specific demographic - from `q10`].",
            "I picked this group because [justification grounded in their needs - from `q9`].",
            "I expect this audience to [characteristics that shape the design - from `q10`, `q11`].",
        ],
    ),
    (
        "## 1.4 Project Goals and Objectives",
        &[
            "The main goal of this project is to [measurable impact on the user - from `q11`].",
            "- **Objective 1 (User Experience/Learning Outcome):** [from `q15`, product-centric and measurable]",
            "- **Objective 2 (Engagement/Aesthetics/Technical Aspect):** [from `q16`]",
            "- **Objective 3 (Skill Demonstration/Problem-Solving):** [from `q14` or `q7`]",
        ],
    ),
    (
        "## 1.5 Project Parameters, Scope, and Constraints",
        &[
            "The final product will be a [product type - from `q2`], delivered as [format and key technical parameters].",
            "It will include [3-5 concrete features that bound the scope].",
            "Main constraints:",
            "- **Time:** about forty-two weeks of the HSC course, managed against a detailed plan.",
            "- **Skills & Knowledge:** [skills to develop - from `q19`, `q20`].",
            "- **Resources & Equipment:** [software and hardware - from `q4`, `q21`].",
            "- **Technical Complexity:** [hardest technical aspect - from `q22`].",
        ],
    ),
    (
        "## 1.6 Timeline and Milestones",
        &[
            "The project is due around Week 3, Term 3; I plan to finish by Week 2 to leave time for trials.",
            "- **Term 4 (Weeks 1-10):** research, concept development and detailed planning.",
            "- **Summer Break:** skill building and early prototypes.",
            "- **Term 1 (Weeks 1-10):** core production and integration.",
            "- **Term 2 (Weeks 1-10):** assets, polish and testing.",
            "- **Term 3 (Weeks 1-2):** final testing, folio documentation and presentation.",
        ],
    ),
    (
        "## 1.7 Expected Outcomes and Success Criteria",
        &[
            "I'll judge '[Project Title]' against my goals and the quality of the product and folio:",
            "1. **Goals Met & User Impact:** [key user outcome from 1.4, evidence from `q17`, `q23`].",
            "2. **Technical Quality & Aesthetics:** [skills from `q27`, style from `q26`, evidence from `q24`].",
            "3. **Audience Fit & Improvement:** [audience from `q10`, evaluation method from `q25`].",
        ],
    ),
    (
        "## 1.8 Opportunities",
        &[
            "Once complete, '[Project Title]' will show my skills in [key skill areas - from `q28`] and support [further study or career pathways].",
        ],
    ),
];

impl PromptBuilder for StatementPromptBuilder {
    fn build(&self, responses: &ResponseMap) -> Result<String, PromptError> {
        if responses.is_empty() {
            return Err(PromptError::NoResponses);
        }

        let mut parts = vec![
            HEADER.to_string(),
            INSTRUCTIONS.to_string(),
            "## Student Responses".to_string(),
            serde_json::to_string_pretty(responses)?,
            "## Statement of Intent Template".to_string(),
        ];

        for (heading, lines) in SECTIONS {
            let mut section = heading.to_string();
            for line in *lines {
                section.push('\n');
                section.push_str(line);
            }
            parts.push(section);
        }

        Ok(parts.join("\n\n"))
    }
}
