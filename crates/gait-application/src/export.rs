//! Markdown export of a stored conversation.

use anyhow::{Context, Result};
use gait_core::GaitError;
use gait_core::kv;
use gait_core::state::StashedState;
use minijinja::{Environment, context};

const PANEL_CHAT_TEMPLATE: &str = r#"# {{ title }}

- Chat: `{{ chat.id }}`
{%- if chat.ai_editor %}
- Editor: {{ chat.ai_editor }}
{%- endif %}
{%- if chat.created_on %}
- Created: {{ chat.created_on }}
{%- endif %}
{% for message in messages %}
## {{ loop.index }}. Prompt
{% if message.timestamp %}
_{{ message.timestamp }}{% if message.model %} · {{ message.model }}{% endif %}_
{% endif %}
{{ message.messageText }}

### Response

{{ message.responseText }}
{% if message.files %}
Files: {% for file in message.files %}`{{ file }}`{% if not loop.last %}, {% endif %}{% endfor %}
{% endif %}
{%- endfor %}
"#;

/// Renders the panel chat `panel_chat_id` as Markdown.
///
/// Tombstoned messages are left out. A tombstoned or unknown chat is reported
/// as not found.
pub fn export_panel_chat(state: &StashedState, panel_chat_id: &str) -> Result<String> {
    let chat = state
        .visible_panel_chats()
        .into_iter()
        .find(|c| c.id == panel_chat_id)
        .ok_or_else(|| GaitError::not_found("PanelChat", panel_chat_id))?;

    let title = if chat.custom_title.trim().is_empty() {
        chat.messages
            .first()
            .and_then(|m| m.message_text.lines().next())
            .unwrap_or("Untitled conversation")
            .to_string()
    } else {
        chat.custom_title.clone()
    };

    let messages = chat
        .messages
        .iter()
        .map(|m| {
            let mut value = serde_json::to_value(m)?;
            value["files"] = serde_json::json!(kv::file_paths(&m.kv_store));
            Ok(value)
        })
        .collect::<Result<Vec<serde_json::Value>, serde_json::Error>>()?;

    let mut env = Environment::new();
    env.add_template("panel_chat", PANEL_CHAT_TEMPLATE)
        .context("Invalid export template")?;
    let rendered = env
        .get_template("panel_chat")?
        .render(context! { title, chat, messages })
        .context("Failed to render conversation")?;
    Ok(rendered)
}
