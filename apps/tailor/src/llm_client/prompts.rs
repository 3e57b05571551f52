// Prompt templates for the three model-backed operations. Placeholders in
// `{braces}` are filled with `str::replace` by the caller.

/// System prompt fragment that enforces JSON-only output.
pub const JSON_ONLY_SYSTEM: &str = "You are a precise, structured assistant. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON value. \
    Do NOT use markdown code fences.";

// ────────────────────────────────────────────────────────────────────────────
// Keyword extraction
// ────────────────────────────────────────────────────────────────────────────

pub const KEYWORD_PROMPT_TEMPLATE: &str = "\
Analyze this job posting and extract the most important ATS keywords.

JOB TITLE: {job_title}

JOB DESCRIPTION:
{job_description}

Return JSON of the form:
{\"keywords\": [\"...\"], \"skills\": [\"...\"], \"action_verbs\": [\"...\"]}

Rules:
- Pick the 5-10 most relevant keywords for ATS matching
- Keywords are short phrases of 1-3 words
- Skills are specific technical skills or tools";

// ────────────────────────────────────────────────────────────────────────────
// Replacement suggestions
// ────────────────────────────────────────────────────────────────────────────

pub const SUGGEST_SYSTEM: &str = "You suggest surgical skill swaps for a résumé. \
    You never rewrite sentences. You respond with valid JSON only.";

pub const SUGGEST_PROMPT_TEMPLATE: &str = "\
Find skills in the résumé's Technical Skills / Skills section that this job does \
NOT need and propose a skill the job DOES need to take their place.

JOB TITLE: {job_title}
REQUIRED SKILLS: {required_keywords}
JOB DESCRIPTION:
{job_description}

RÉSUMÉ:
{resume_excerpt}

Rules:
1. Only touch the skills section. Never the summary, header, education, company names or job titles.
2. `original` must appear verbatim in the résumé.
3. Keep the replacement within roughly ±40% of the original's length.
4. At most 5 replacements.

Return JSON:
{\"replacements\": [{\"original\": \"...\", \"replacement\": \"...\", \"context\": \"...\", \"reason\": \"...\", \"max_occurrences\": 1}]}

If nothing qualifies return {\"replacements\": []}.";

// ────────────────────────────────────────────────────────────────────────────
// ATS scoring
// ────────────────────────────────────────────────────────────────────────────

pub const ATS_SCORE_SYSTEM: &str = JSON_ONLY_SYSTEM;

pub const ATS_SCORE_PROMPT_TEMPLATE: &str = "\
Score this résumé's ATS compatibility with the job below.

JOB TITLE: {job_title}

JOB DESCRIPTION:
{job_description}

RÉSUMÉ:
{resume_text}

Return JSON:
{\"overall_score\": <integer 0-100>, \"matched_skills\": [\"...\"], \"missing_skills\": [\"...\"]}";
