//! Payload Normalization
//!
//! Converts the arbitrarily-shaped "fusion" payload emitted by the chat
//! service into the fixed [`AnalysisResult`] view model. The upstream
//! agents were written independently and their field names drifted over
//! time, so every field here is resolved through an explicit precedence
//! list rather than scattered fallbacks:
//!
//! | field | resolution order |
//! |---|---|
//! | payload nesting | `root` → `fusion` (`root.fusion` else `root`) → `decision` (`fusion.decision` else `root.decision`) |
//! | summary | `fusion.summary`, `root.summary`, `"Analysis complete."` |
//! | confidence | `decision.confidence`, `fusion.overallConfidence`, `fusion.confidence`, `"N/A"` |
//! | agent summary | `summary`, `message`, `details`, `response`, fixed fallback |
//! | record id | `actionId`/`approvalId`, `id`, `payload.id`, generated |
//!
//! Every function in this module is total: malformed input degrades to
//! empty objects, empty lists, or fallback labels, never to an error.

use serde_json::Value;

use crate::model::{
    unique_id, ActionItem, AgentFinding, AgentInsights, AnalysisResult, ApprovalItem, Notification,
    WorkflowLogEntry,
};
use crate::text::{format_narrative, json_truthy, strip_markdown_summary};

/// Resolve the string-or-object duality of incoming payloads once, at
/// the boundary.
///
/// The service historically emitted `final_response.response` (and the
/// nested `fusion`/`decision` levels) either as a JSON object or as a
/// JSON-encoded string of one. A string that fails to parse degrades to
/// an empty object; downstream code only ever sees resolved values.
pub fn parse_payload(value: &Value) -> Value {
    match value {
        Value::String(raw) => serde_json::from_str(raw).unwrap_or_else(|_| empty_object()),
        Value::Null => empty_object(),
        other => other.clone(),
    }
}

fn empty_object() -> Value {
    Value::Object(serde_json::Map::new())
}

/// Coerce a possibly-missing, possibly-scalar field into a list:
/// missing/falsy → empty, scalar → single element, array → unchanged.
pub fn ensure_array(value: Option<&Value>) -> Vec<Value> {
    match value {
        None => Vec::new(),
        Some(Value::Array(items)) => items.clone(),
        Some(v) if !json_truthy(v) => Vec::new(),
        Some(v) => vec![v.clone()],
    }
}

/// [`ensure_array`] for string-valued lists; non-string elements are
/// rendered as their JSON text rather than dropped.
pub fn ensure_string_array(value: Option<&Value>) -> Vec<String> {
    ensure_array(value)
        .into_iter()
        .map(|item| match item {
            Value::String(s) => s,
            other => other.to_string(),
        })
        .collect()
}

// Renders any JSON scalar as the string an id or label should carry.
fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn string_field(object: &Value, key: &str) -> Option<String> {
    object
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

// `a ?? b`: only a missing/null first choice falls through.
fn field_or<'a>(primary: &'a Value, secondary: &'a Value, key: &str) -> Option<&'a Value> {
    match primary.get(key) {
        Some(Value::Null) | None => secondary.get(key),
        found => found,
    }
    .filter(|v| !v.is_null())
}

fn string_field_or(primary: &Value, secondary: &Value, key: &str) -> Option<String> {
    field_or(primary, secondary, key).map(value_to_string)
}

/// Generated identifier for records that arrive without one.
pub fn fallback_id(prefix: &str) -> String {
    unique_id(prefix)
}

/// Format the overall confidence score as a whole percentage.
///
/// Only a strictly numeric score in any of the known locations counts;
/// anything else renders the literal `"N/A"`.
pub fn format_confidence(decision: &Value, fusion: &Value) -> String {
    let score = decision
        .get("confidence")
        .and_then(Value::as_f64)
        .or_else(|| fusion.get("overallConfidence").and_then(Value::as_f64))
        .or_else(|| fusion.get("confidence").and_then(Value::as_f64));
    match score {
        Some(score) => format!("{}%", (score * 100.0).round() as i64),
        None => "N/A".to_string(),
    }
}

/// Normalize a risk level to its display label.
///
/// The canonical levels title-case; the various "we don't know" spellings
/// collapse to `"Not assessed"`; any other non-empty value is title-cased
/// as-is so new upstream levels still render.
pub fn normalize_risk_level(value: Option<&Value>) -> String {
    let Some(value) = value.filter(|v| !v.is_null()) else {
        return "Not assessed".to_string();
    };
    let raw = value_to_string(value);
    let normalized = raw.trim().to_lowercase();
    if normalized.is_empty()
        || matches!(
            normalized.as_str(),
            "unknown" | "n/a" | "na" | "none" | "not_available"
        )
    {
        return "Not assessed".to_string();
    }
    crate::text::title_case(&raw)
}

/// Normalize an agent status: absent stays absent, the "unknown"
/// spellings become the default `info`, everything else lowercases.
pub fn normalize_agent_status(status: Option<&Value>) -> Option<String> {
    let status = status.filter(|v| json_truthy(v))?;
    let normalized = value_to_string(status).trim().to_lowercase();
    if normalized.is_empty() || matches!(normalized.as_str(), "unknown" | "n/a" | "na" | "none") {
        return Some("info".to_string());
    }
    Some(normalized)
}

/// Derive an agent finding's one-line summary.
///
/// Tries `summary`, `message`, `details`, `response` in order. The first
/// non-empty string wins, markdown-stripped. An object candidate is
/// pretty-printed instead. A string candidate that looks like a Python
/// dict from the agent runtime wrapper (starts with `{`, mentions
/// `'brand'`) is junk and skipped. With nothing usable, a fixed fallback
/// sentence is returned.
pub fn agent_summary(raw: &Value) -> String {
    for key in ["summary", "message", "details", "response"] {
        let Some(candidate) = raw.get(key) else {
            continue;
        };
        match candidate {
            Value::Null => continue,
            Value::String(text) => {
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    continue;
                }
                if trimmed.starts_with('{') && trimmed.contains("'brand'") {
                    continue;
                }
                return strip_markdown_summary(trimmed);
            }
            Value::Object(_) | Value::Array(_) => {
                if let Ok(serialized) = serde_json::to_string_pretty(candidate) {
                    return strip_markdown_summary(&serialized);
                }
            }
            _ => continue,
        }
    }
    "No findings provided for this agent.".to_string()
}

/// Normalize one raw agent finding from the fusion payload.
pub fn to_agent_finding(raw: &Value) -> AgentFinding {
    let insights = raw
        .get("insights")
        .filter(|v| json_truthy(v))
        .map(|insights| AgentInsights {
            overview: string_field(insights, "overview"),
            summary: string_field(insights, "summary"),
            metrics: ensure_string_array(insights.get("metrics")),
            blockers: ensure_string_array(insights.get("blockers")),
            recommendations: ensure_string_array(insights.get("recommendations")),
        });

    AgentFinding {
        agent: string_field(raw, "agent").unwrap_or_else(|| "Agent".to_string()),
        status: normalize_agent_status(raw.get("status")),
        summary: agent_summary(raw),
        blockers: ensure_string_array(raw.get("blockers")),
        recommendations: ensure_string_array(raw.get("recommendations")),
        insights,
    }
}

/// Normalize one raw action from the fusion payload. Only the fields
/// the fusion shape carries are populated; the richer fields arrive
/// later from the workflow store via [`map_action_record`].
pub fn to_action_item(raw: &Value) -> ActionItem {
    ActionItem {
        id: raw
            .get("id")
            .filter(|v| !v.is_null())
            .map(value_to_string)
            .unwrap_or_else(|| fallback_id("action")),
        description: string_field(raw, "description").unwrap_or_else(|| "Action".to_string()),
        status: string_field(raw, "status"),
        kind: string_field(raw, "type"),
        data: raw.get("data").filter(|v| !v.is_null()).cloned(),
        ..Default::default()
    }
}

/// Normalize one raw approval from the fusion payload.
pub fn to_approval_item(raw: &Value) -> ApprovalItem {
    ApprovalItem {
        id: raw
            .get("id")
            .filter(|v| !v.is_null())
            .map(value_to_string)
            .unwrap_or_else(|| fallback_id("approval")),
        title: string_field(raw, "title").unwrap_or_else(|| "Approval Required".to_string()),
        risk: string_field(raw, "risk"),
        requires: string_field(raw, "requires"),
        status: string_field(raw, "status"),
        details: raw.get("details").filter(|v| !v.is_null()).cloned(),
        ..Default::default()
    }
}

/// Build the view model for one completed query from a raw
/// `final_response.response` value.
pub fn build_analysis_result(payload: &Value) -> AnalysisResult {
    let root = parse_payload(payload);
    let fusion = parse_payload(root.get("fusion").filter(|v| !v.is_null()).unwrap_or(&root));
    let decision_source = fusion
        .get("decision")
        .filter(|v| !v.is_null())
        .or_else(|| root.get("decision"))
        .cloned()
        .unwrap_or(Value::Null);
    let decision = parse_payload(&decision_source);

    let summary = string_field(&fusion, "summary")
        .or_else(|| string_field(&root, "summary"))
        .unwrap_or_else(|| "Analysis complete.".to_string());

    let agent_findings = ensure_array(field_or(&fusion, &root, "agentFindings"))
        .iter()
        .map(to_agent_finding)
        .collect();
    let actions = ensure_array(field_or(&fusion, &root, "actions"))
        .iter()
        .map(to_action_item)
        .collect();
    let approvals = ensure_array(field_or(&fusion, &root, "approvals"))
        .iter()
        .map(to_approval_item)
        .collect();

    let narrative = string_field(&fusion, "narrative")
        .or_else(|| string_field(&root, "narrative"))
        .and_then(|n| format_narrative(&n));

    AnalysisResult {
        summary,
        can_fulfill: decision.get("canFulfill").and_then(Value::as_bool),
        confidence: format_confidence(&decision, &fusion),
        risk_level: normalize_risk_level(decision.get("riskLevel")),
        blockers: ensure_string_array(decision.get("blockers")),
        agent_findings,
        actions,
        approvals,
        next_steps: ensure_string_array(field_or(&fusion, &root, "nextSteps")),
        narrative,
        session_id: string_field(&fusion, "sessionId").or_else(|| string_field(&root, "sessionId")),
        query_type: string_field(&root, "queryType").or_else(|| string_field(&fusion, "queryType")),
    }
}

fn map_workflow_log(record: &Value) -> Option<Vec<WorkflowLogEntry>> {
    let entries = record.get("workflowLog")?.as_array()?;
    Some(
        entries
            .iter()
            .map(|entry| WorkflowLogEntry {
                timestamp: string_field(entry, "timestamp"),
                event: string_field(entry, "event"),
                message: string_field(entry, "message"),
                actor: string_field(entry, "actor"),
            })
            .collect(),
    )
}

fn map_notification(record: &Value, payload: &Value) -> Option<Notification> {
    let nested = record.get("notification").filter(|v| v.is_object());
    let subject = nested
        .and_then(|n| string_field(n, "subject"))
        .or_else(|| string_field_or(record, payload, "notificationSubject"));
    let body = nested
        .and_then(|n| string_field(n, "body"))
        .or_else(|| string_field_or(record, payload, "notificationBody"));
    if subject.is_some() || body.is_some() {
        Some(Notification { subject, body })
    } else {
        None
    }
}

/// Map a persisted action record from the workflow store into the view
/// model. Fields may live at the record root or under its nested
/// `payload`; the record wins where both are present.
pub fn map_action_record(record: &Value) -> ActionItem {
    let payload = record
        .get("payload")
        .filter(|v| v.is_object())
        .cloned()
        .unwrap_or_else(empty_object);
    let id = record
        .get("actionId")
        .or_else(|| record.get("id"))
        .or_else(|| payload.get("id"))
        .filter(|v| !v.is_null())
        .map(value_to_string)
        .unwrap_or_else(|| fallback_id("action"));

    ActionItem {
        id,
        description: string_field_or(record, &payload, "description")
            .unwrap_or_else(|| "Action item".to_string()),
        status: string_field_or(record, &payload, "status"),
        kind: string_field_or(record, &payload, "type"),
        owner: string_field_or(record, &payload, "owner"),
        risk_level: string_field_or(record, &payload, "riskLevel"),
        updated_at: string_field_or(record, &payload, "updatedAt"),
        completed_at: string_field_or(record, &payload, "completedAt"),
        last_comment: string_field_or(record, &payload, "lastComment"),
        data: Some(
            payload
                .get("data")
                .filter(|v| !v.is_null())
                .cloned()
                .unwrap_or_else(|| payload.clone()),
        ),
        notification: map_notification(record, &payload),
        workflow_log: map_workflow_log(record),
    }
}

/// Map a persisted approval record from the workflow store. An approval
/// without an explicit decision inherits its status as the decision.
pub fn map_approval_record(record: &Value) -> ApprovalItem {
    let payload = record
        .get("payload")
        .filter(|v| v.is_object())
        .cloned()
        .unwrap_or_else(empty_object);
    let id = record
        .get("approvalId")
        .or_else(|| record.get("id"))
        .or_else(|| payload.get("id"))
        .filter(|v| !v.is_null())
        .map(value_to_string)
        .unwrap_or_else(|| fallback_id("approval"));
    let status = string_field_or(record, &payload, "status");

    ApprovalItem {
        id,
        title: string_field_or(record, &payload, "title")
            .unwrap_or_else(|| "Approval Required".to_string()),
        risk: string_field_or(record, &payload, "risk"),
        requires: string_field_or(record, &payload, "requires"),
        decision: string_field_or(record, &payload, "decision").or_else(|| status.clone()),
        status,
        decided_by: string_field_or(record, &payload, "decidedBy"),
        decision_at: string_field_or(record, &payload, "decisionAt"),
        requested_at: string_field_or(record, &payload, "requestedAt"),
        last_comment: string_field_or(record, &payload, "lastComment"),
        details: Some(
            record
                .get("details")
                .or_else(|| payload.get("details"))
                .filter(|v| !v.is_null())
                .cloned()
                .unwrap_or(payload.clone()),
        ),
        notification: map_notification(record, &payload),
        workflow_log: map_workflow_log(record),
    }
}

macro_rules! merge_optional_fields {
    ($existing:expr, $update:expr, [$($field:ident),+ $(,)?]) => {
        $(
            if $update.$field.is_some() {
                $existing.$field = $update.$field.clone();
            }
        )+
    };
}

fn merge_action(existing: &mut ActionItem, update: &ActionItem) {
    if !update.description.is_empty() {
        existing.description = update.description.clone();
    }
    merge_optional_fields!(
        existing,
        update,
        [
            status,
            kind,
            owner,
            risk_level,
            updated_at,
            completed_at,
            last_comment,
            data,
            notification,
            workflow_log,
        ]
    );
}

fn merge_approval(existing: &mut ApprovalItem, update: &ApprovalItem) {
    if !update.title.is_empty() {
        existing.title = update.title.clone();
    }
    merge_optional_fields!(
        existing,
        update,
        [
            risk,
            requires,
            status,
            decision,
            decided_by,
            decision_at,
            requested_at,
            last_comment,
            details,
            notification,
            workflow_log,
        ]
    );
}

/// Merge refreshed action records into the current list by id. Existing
/// entries keep their position and any fields the update leaves unset;
/// unseen ids append in arrival order. Nothing is ever removed.
pub fn merge_action_lists(base: &[ActionItem], updates: &[ActionItem]) -> Vec<ActionItem> {
    let mut merged: Vec<ActionItem> = base.to_vec();
    for update in updates {
        match merged.iter_mut().find(|existing| existing.id == update.id) {
            Some(existing) => merge_action(existing, update),
            None => merged.push(update.clone()),
        }
    }
    merged
}

/// Merge refreshed approval records into the current list by id; same
/// semantics as [`merge_action_lists`].
pub fn merge_approval_lists(base: &[ApprovalItem], updates: &[ApprovalItem]) -> Vec<ApprovalItem> {
    let mut merged: Vec<ApprovalItem> = base.to_vec();
    for update in updates {
        match merged.iter_mut().find(|existing| existing.id == update.id) {
            Some(existing) => merge_approval(existing, update),
            None => merged.push(update.clone()),
        }
    }
    merged
}
