use anyhow::{Context, Result};

use crate::schema::VisualAnalysis;

pub fn build_visual_prompt(srt_content: &str) -> String {
    format!(
        r#"You are a meticulous video analyst. You will be given a video recording of a business call and its SRT subtitle transcript. Your job is to walk through the video chronologically and extract structured observations about everything shown on screen.

## SRT Transcript
{}

## Instructions
Walk through the video from beginning to end. For each distinct visual segment (screen share, UI shown, document, spreadsheet, app, etc.), record:

1. **timestamp** — approximate start time (MM:SS or HH:MM:SS)
2. **end_timestamp** — approximate end time
3. **type** — one of: "screen_share", "spreadsheet", "app_ui", "document", "presentation", "website", "map", "chart", "other"
4. **description** — what is being shown on screen in detail
5. **data_fields** — any specific data fields, column headers, form fields, or labels visible
6. **ui_elements** — buttons, menus, navigation elements, tabs visible
7. **workflow_action** — what the user is doing (scrolling, clicking, entering data, etc.)
8. **spoken_context** — what is being said at this moment (reference the subtitles)

Also extract:
- **app_names** — names of any applications or websites shown
- **data_sources** — any data sources mentioned or visible (APIs, databases, services)
- **pain_points_visual** — any visual evidence of friction, manual work, or workarounds

Return your analysis as a JSON object with this structure:
{{
  "observations": [
    {{
      "timestamp": "MM:SS",
      "end_timestamp": "MM:SS",
      "type": "screen_share",
      "description": "...",
      "data_fields": ["field1", "field2"],
      "ui_elements": ["button1", "menu1"],
      "workflow_action": "...",
      "spoken_context": "..."
    }}
  ],
  "app_names": ["app1", "app2"],
  "data_sources": ["source1", "source2"],
  "pain_points_visual": ["pain1", "pain2"]
}}

Be extremely thorough. Capture every screen transition, every spreadsheet shown, every data entry moment. Include specific field names, column headers, and UI labels exactly as they appear on screen.

Return ONLY valid JSON, no markdown fences.
"#,
        srt_content
    )
}

pub fn build_synthesis_prompt(visual_analysis: &VisualAnalysis, srt_content: &str) -> Result<String> {
    let visual_json = serde_json::to_string_pretty(visual_analysis)
        .context("Failed to serialize visual analysis for prompt")?;

    Ok(format!(
        r#"You are a product analyst. You will be given two inputs:
1. A structured visual analysis of a video call (JSON with timestamped observations)
2. The full SRT subtitle transcript of the same call

Your job is to synthesize these into a structured product research document.

## Visual Analysis
{}

## SRT Transcript
{}

## Instructions
Analyze both inputs together and produce a structured JSON document covering:

1. **pain_points** — specific problems discussed, with evidence from both visual and verbal sources. Each should have: description, severity (critical/high/medium/low), evidence (quotes or visual references), and timestamp.

2. **current_workflows** — step-by-step descriptions of how users currently do their work. Reference specific tools, screens, and data sources observed.

3. **data_sources** — all data sources mentioned or shown: name, type, what data they provide, how they're accessed, any limitations mentioned.

4. **user_personas** — distinct user types discussed, their roles, goals, frustrations, and tech sophistication.

5. **stated_requirements** — any explicit feature requests or requirements mentioned. Include who stated them and the context.

6. **implicit_requirements** — requirements implied by the pain points and workflows but not explicitly stated.

7. **market_context** — industry, market size, competitors mentioned, regulatory considerations, any market-specific details.

8. **key_metrics** — any numbers, KPIs, or benchmarks mentioned (deal sizes, time spent, accuracy rates, etc.).

9. **technical_constraints** — any technical limitations, integration requirements, or platform preferences mentioned.

10. **visual_evidence_summary** — the most important visual observations that inform product decisions, organized by theme.

Return as JSON:
{{
  "pain_points": [...],
  "current_workflows": [...],
  "data_sources": [...],
  "user_personas": [...],
  "stated_requirements": [...],
  "implicit_requirements": [...],
  "market_context": {{...}},
  "key_metrics": [...],
  "technical_constraints": [...],
  "visual_evidence_summary": [...]
}}

Be specific. Reference timestamps. Quote the speakers when possible. Do not generalize — use the actual details from the video.

Return ONLY valid JSON, no markdown fences.
"#,
        visual_json, srt_content
    ))
}
