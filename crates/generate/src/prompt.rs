use anyhow::{Context, Result};

use extract::Synthesis;

pub const SYSTEM_PROMPT: &str =
    "You are a senior product manager and technical architect producing a detailed PRD.";

pub fn build_plan_prompt(synthesis: &Synthesis) -> Result<String> {
    let synthesis_json = serde_json::to_string_pretty(synthesis)
        .context("Failed to serialize synthesis for prompt")?;

    Ok(format!(
        r#"You are a senior product manager and technical architect. You will be given a structured synthesis document from a user research video call. Your job is to generate a complete, production-quality Product Requirements Document (PRD) and engineering plan.

## Synthesis Document
{}

## Instructions
Generate a complete PRD in Markdown format with the following sections. Each section should be thorough and reference specific findings from the synthesis.

### Required Sections

1. **Executive Summary** — 2-3 paragraph overview of the product opportunity, target users, and proposed solution.

2. **Problem Statement** — detailed description of the problems being solved. Include specific examples from the video call (reference timestamps and quotes).

3. **User Personas** — detailed persona cards for each user type identified. Include goals, frustrations, technical proficiency, and day-in-the-life scenarios.

4. **Current Workflow** — step-by-step walkthrough of how users accomplish their tasks today, with specific tools and data sources referenced. Highlight friction points at each step.

5. **Proposed Solution** — high-level description of the product. What it does, how it differs from current approaches, and the core value proposition.

6. **User Stories** — organized by priority:
   - P0 (Must Have for MVP)
   - P1 (Should Have for V1)
   - P2 (Nice to Have for V2)
   Format: "As a [persona], I want to [action] so that [benefit]" with acceptance criteria.

7. **Technical Architecture** — system architecture including:
   - High-level architecture diagram (described textually)
   - Key components and their responsibilities
   - Data flow between components
   - Third-party integrations required

8. **Data Model** — key entities, their attributes, and relationships. Present as a schema description.

9. **API Design** — key API endpoints with methods, paths, request/response shapes. Focus on the core domain operations.

10. **MVP Scope** — clearly defined MVP boundary. What's in, what's out, and why.

11. **Implementation Phases**:
    - **MVP** (4-6 weeks): core features, minimum viable product
    - **V1** (8-12 weeks): full feature set for initial launch
    - **V2** (16-24 weeks): advanced features, scale, optimization
    Each phase should list specific features, technical tasks, and milestones.

12. **Success Metrics** — quantitative and qualitative metrics to measure product success. Include baseline measurements where available from the synthesis.

13. **Appendix: Visual Evidence** — key observations from screen shares organized by theme. Reference specific tools, data fields, and UI patterns observed in the video. This section should help engineers understand the domain by seeing what users actually work with.

### Writing Guidelines
- Be specific, not generic. Reference actual data fields, tool names, and workflows from the synthesis.
- Include concrete numbers where available.
- User stories should have clear acceptance criteria.
- Technical sections should be implementable by an engineering team.
- The PRD should stand alone — a reader shouldn't need to watch the video.

Output the complete PRD in Markdown format.
"#,
        synthesis_json
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_plan_prompt_embeds_synthesis() {
        let synthesis = Synthesis(json!({"key_metrics": ["40 hrs/week"]}));
        let prompt = build_plan_prompt(&synthesis).unwrap();

        assert!(prompt.contains("## Synthesis Document\n{\n  \"key_metrics\": [\n    \"40 hrs/week\"\n  ]\n}"));
        assert!(prompt.contains("1. **Executive Summary**"));
        assert!(prompt.contains("13. **Appendix: Visual Evidence**"));
    }
}
