// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Formatting of the individual context sections.
//!
//! Each function is pure: it takes already loaded data plus a token budget
//! and returns the section text, or an empty string when there is nothing
//! to say or nothing fits.

use parley_core::{EntityType, KnowledgeEntity, KnowledgeProfile, MeetingSummary};

use crate::tokens::{estimate_tokens, truncate_to_tokens};

/// Hard cap for the profile section.
pub const PROFILE_SECTION_MAX_TOKENS: usize = 500;
/// Hard cap for the recent meetings section.
pub const RECENT_SECTION_MAX_TOKENS: usize = 800;
/// Tokens held back from the recent meetings section for what follows it.
pub const RECENT_SECTION_RESERVE: usize = 200;
/// Recent summaries considered.
pub const RECENT_SUMMARY_LIMIT: u32 = 20;
/// Entities considered.
pub const ENTITY_LIMIT: u32 = 15;

const PROFILE_LIST_LIMIT: usize = 5;
const TOPICS_PER_MEETING: usize = 3;
const PROJECTS_LIMIT: usize = 5;
const COMPANIES_LIMIT: usize = 3;

/// Profile background, key people, open projects, and terminology.
///
/// Empty when the profile has no summary. Truncated to
/// [`PROFILE_SECTION_MAX_TOKENS`].
pub fn profile_section(profile: &KnowledgeProfile) -> String {
    let Some(background) = profile
        .summary
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
    else {
        return String::new();
    };

    let mut out = format!("### Profile\nBackground: {background}");

    let people: Vec<String> = profile
        .key_people
        .iter()
        .filter(|p| !p.name.trim().is_empty())
        .take(PROFILE_LIST_LIMIT)
        .map(|p| {
            let mut line = format!("- {}", p.name);
            if !p.role.is_empty() {
                line.push_str(&format!(", {}", p.role));
            }
            if !p.relationship.is_empty() {
                line.push_str(&format!(" ({})", p.relationship));
            }
            line
        })
        .collect();
    if !people.is_empty() {
        out.push_str("\nKey people:\n");
        out.push_str(&people.join("\n"));
    }

    let projects: Vec<String> = profile
        .key_projects
        .iter()
        .filter(|p| !p.name.trim().is_empty() && !p.is_completed())
        .take(PROFILE_LIST_LIMIT)
        .map(|p| {
            let mut line = format!("- {}", p.name);
            if !p.status.is_empty() {
                line.push_str(&format!(" [{}]", p.status));
            }
            if !p.description.is_empty() {
                line.push_str(&format!(": {}", p.description));
            }
            line
        })
        .collect();
    if !projects.is_empty() {
        out.push_str("\nActive projects:\n");
        out.push_str(&projects.join("\n"));
    }

    let terms: Vec<String> = profile
        .terminology
        .iter()
        .filter(|t| !t.term.trim().is_empty())
        .take(PROFILE_LIST_LIMIT)
        .map(|t| format!("- {}: {}", t.term, t.meaning))
        .collect();
    if !terms.is_empty() {
        out.push_str("\nTerminology:\n");
        out.push_str(&terms.join("\n"));
    }

    if estimate_tokens(&out) > PROFILE_SECTION_MAX_TOKENS {
        truncate_to_tokens(&out, PROFILE_SECTION_MAX_TOKENS)
    } else {
        out
    }
}

/// Budget for the recent meetings section given what is left overall.
pub fn recent_section_budget(remaining: usize) -> usize {
    remaining
        .saturating_sub(RECENT_SECTION_RESERVE)
        .min(RECENT_SECTION_MAX_TOKENS)
}

fn meeting_line(summary: &MeetingSummary) -> String {
    let mut line = format!(
        "- [{}] {}",
        summary.created_at.format("%Y-%m-%d"),
        summary.summary.trim()
    );
    let topics: Vec<&str> = summary
        .topics
        .iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .take(TOPICS_PER_MEETING)
        .collect();
    if !topics.is_empty() {
        line.push_str(&format!(" (Topics: {})", topics.join(", ")));
    }
    line
}

/// One line per summary, newest first, until the next line would push the
/// section past `budget`. Lines are never cut.
pub fn recent_meetings_section(summaries: &[MeetingSummary], budget: usize) -> String {
    let mut out = String::from("### Recent Meetings");
    let mut added = 0;
    for summary in summaries {
        let candidate = format!("{out}\n{}", meeting_line(summary));
        if estimate_tokens(&candidate) > budget {
            break;
        }
        out = candidate;
        added += 1;
    }
    if added == 0 { String::new() } else { out }
}

/// Frequently mentioned people, projects, and companies.
///
/// Returns an empty string when nothing qualifies or the section does not
/// fit in `remaining`.
pub fn entities_section(entities: &[KnowledgeEntity], remaining: usize) -> String {
    let names = |kind: EntityType, limit: usize| -> Vec<&str> {
        entities
            .iter()
            .filter(|e| e.entity_type == kind)
            .map(|e| e.name.as_str())
            .take(limit)
            .collect()
    };

    let mut lines = Vec::new();
    for (label, kind, limit) in [
        ("People", EntityType::Person, usize::MAX),
        ("Projects", EntityType::Project, PROJECTS_LIMIT),
        ("Companies", EntityType::Company, COMPANIES_LIMIT),
    ] {
        let found = names(kind, limit);
        if !found.is_empty() {
            lines.push(format!("{label}: {}", found.join(", ")));
        }
    }
    if lines.is_empty() {
        return String::new();
    }

    let out = format!("### Frequently Mentioned\n{}", lines.join("\n"));
    if estimate_tokens(&out) > remaining {
        String::new()
    } else {
        out
    }
}
