//! Server-rendered pages and fragments.
//!
//! HTML-first, in the shell + content-function style: every view is a
//! string assembled here and swapped whole, with HTMX annotations where a
//! round-trip should not replace the page. All user-originated text passes
//! through [`escape`] before interpolation.

use uuid::Uuid;

use crate::auth::AuthUser;
use crate::backend::{Chat, ChatMessage};

/// Escape text for interpolation into HTML content or attribute values.
#[must_use]
pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Sidebar preview: first line of the last message, cut at a char boundary.
#[must_use]
pub fn preview(text: &str) -> String {
    let first_line = text.lines().next().unwrap_or(text);
    if first_line.len() > 50 {
        let boundary = first_line
            .char_indices()
            .take_while(|(i, _)| *i < 47)
            .last()
            .map(|(i, c)| i + c.len_utf8())
            .unwrap_or(47);
        format!("{}...", &first_line[..boundary])
    } else {
        first_line.to_string()
    }
}

/// Generate the HTML shell for the application.
fn html_shell(title: &str, content: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <title>{title} - Chat App</title>

    <!-- HTMX (local) -->
    <script src="/static/vendor/htmx-2.0.8.min.js"></script>

    <link rel="stylesheet" href="/static/app.css">
</head>
<body>
    <main id="app">
{content}
    </main>
</body>
</html>"#
    )
}

// ─────────────────────────────────────────────────────────────────────────────
// Auth pages
// ─────────────────────────────────────────────────────────────────────────────

fn inline_error(error: Option<&str>) -> String {
    match error {
        Some(message) => format!(
            r#"<div class="error-message"><span class="error-icon">⚠️</span> {}</div>"#,
            escape(message)
        ),
        None => String::new(),
    }
}

/// Sign-in page. `email` survives a failed attempt so the form re-renders
/// with what the user typed.
#[must_use]
pub fn sign_in_page(error: Option<&str>, email: &str) -> String {
    let content = format!(
        r#"<div class="auth-card">
    <div class="auth-header">
        <h2>Welcome Back</h2>
        <p class="auth-subtitle">Sign in to your account</p>
    </div>
    <form method="post" action="/login" class="auth-form">
        <input type="email" name="email" placeholder="Enter your email" value="{email}" required class="auth-input">
        <input type="password" name="password" placeholder="Enter your password" required class="auth-input">
        <button type="submit" class="auth-button">Sign In</button>
    </form>
    {error}
    <div class="auth-footer">
        <p>Don't have an account? <a href="/signup" class="link-button">Sign up</a></p>
    </div>
</div>"#,
        email = escape(email),
        error = inline_error(error),
    );
    html_shell("Sign In", &content)
}

#[must_use]
pub fn sign_up_page(error: Option<&str>, email: &str) -> String {
    let content = format!(
        r#"<div class="auth-card">
    <div class="auth-header">
        <h2>Create Account</h2>
        <p class="auth-subtitle">Join us and start your journey</p>
    </div>
    <form method="post" action="/signup" class="auth-form">
        <input type="email" name="email" placeholder="Enter your email" value="{email}" required class="auth-input">
        <input type="password" name="password" placeholder="Create a password" minlength="6" required class="auth-input">
        <button type="submit" class="auth-button">Sign Up</button>
    </form>
    {error}
    <div class="auth-footer">
        <p>Already have an account? <a href="/" class="link-button">Sign in</a></p>
    </div>
</div>"#,
        email = escape(email),
        error = inline_error(error),
    );
    html_shell("Sign Up", &content)
}

// ─────────────────────────────────────────────────────────────────────────────
// Chat screen
// ─────────────────────────────────────────────────────────────────────────────

/// The full chat screen: sidebar with the chat list and forms, main area
/// with the selected conversation (or the welcome panel).
#[must_use]
pub fn chats_page(user: &AuthUser, chats: &[Chat], selected: Option<&Chat>) -> String {
    let sidebar = sidebar(chats, selected);
    let main = match selected {
        Some(chat) => chat_panel(user.id, chat),
        None => welcome_panel().to_string(),
    };

    let content = format!(
        r#"<div class="chats-container">
    <div class="chats-sidebar">
{sidebar}
    </div>
    <div class="chat-main">
{main}
    </div>
</div>"#
    );
    html_shell("Chats", &content)
}

/// Chat screen fallback when the initial fetch fails: the error with a
/// manual Retry affordance, nothing else.
#[must_use]
pub fn chats_fetch_error_page(message: &str) -> String {
    let content = format!(
        r#"<div class="chats-container">
    <div class="error-message">
        <p>Error loading chats: {}</p>
        <a href="/chats" class="retry-button">Retry</a>
    </div>
</div>"#,
        escape(message)
    );
    html_shell("Chats", &content)
}

fn sidebar(chats: &[Chat], selected: Option<&Chat>) -> String {
    let list = if chats.is_empty() {
        r#"<div class="no-chats"><p>No chats yet. Create your first chat!</p></div>"#.to_string()
    } else {
        chats
            .iter()
            .map(|chat| sidebar_item(chat, selected.is_some_and(|s| s.id == chat.id)))
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        r#"        <div class="sidebar-header">
            <h3>Your Chats</h3>
            <form method="post" action="/logout">
                <button type="submit" class="logout-button">Logout</button>
            </form>
        </div>
        <details class="new-chat">
            <summary class="new-chat-button">+ New Chat</summary>
            <form method="post" action="/chats" class="new-chat-form">
                <input type="text" name="title" placeholder="Enter chat title" required autofocus class="new-chat-input">
                <button type="submit" class="create-button">Create</button>
            </form>
        </details>
        <div class="chats-list">
{list}
        </div>"#
    )
}

fn sidebar_item(chat: &Chat, active: bool) -> String {
    let active_class = if active { " active" } else { "" };
    let preview_text = chat
        .messages
        .last()
        .map_or_else(|| "No messages yet".to_string(), |m| preview(&m.content));

    format!(
        r#"            <div class="chat-item{active_class}">
                <a class="chat-content" href="/chats?chat={id}">
                    <div class="chat-title">{title}</div>
                    <div class="chat-preview">{preview}</div>
                </a>
                <div class="chat-actions">
                    <details class="edit-chat">
                        <summary title="Edit chat title">✏️</summary>
                        <form method="post" action="/chats/{id}/rename" class="edit-chat-form">
                            <input type="text" name="title" value="{title}" required class="edit-chat-input">
                            <button type="submit" class="save-button" title="Save">✓</button>
                        </form>
                    </details>
                    <form method="post" action="/chats/{id}/delete"
                          onsubmit="return confirm('Are you sure you want to delete this chat? This action cannot be undone and will delete all messages in this chat.')">
                        <button type="submit" class="delete-button" title="Delete chat">🗑️</button>
                    </form>
                </div>
            </div>"#,
        id = chat.id,
        title = escape(&chat.title),
        preview = escape(&preview_text),
    )
}

fn welcome_panel() -> &'static str {
    r#"        <div class="no-chat-selected">
            <h3>Welcome to your chats!</h3>
            <p>Select a chat from the sidebar to start messaging, or create a new chat.</p>
        </div>"#
}

fn chat_panel(viewer_id: Uuid, chat: &Chat) -> String {
    let region = messages_region(viewer_id, chat, None);
    format!(
        r##"        <div class="chat-header">
            <h3>{title}</h3>
            <div class="chat-info">{count} messages</div>
        </div>
        <div id="messages" class="messages-container">
{region}
        </div>
        <form class="message-form"
              hx-post="/chats/{id}/messages"
              hx-target="#messages"
              hx-swap="innerHTML"
              hx-on--before-request="
                  const msg = this.querySelector('[name=message]').value.trim();
                  if (msg) {{
                      const item = document.createElement('div');
                      item.className = 'message user-message pending';
                      item.textContent = msg;
                      document.querySelector('#messages').appendChild(item);
                  }}
              "
              hx-on--after-request="this.reset()">
            <textarea name="message" placeholder="Type your message..." rows="1" required class="message-input"></textarea>
            <button type="submit" class="send-button">Send</button>
        </form>"##,
        title = escape(&chat.title),
        count = chat.messages.len(),
        id = chat.id,
    )
}

/// The messages region of a chat, also returned on its own as the fragment
/// swapped in after a send. `flash` carries a send-sequence failure so it
/// lands inside the region the user is looking at.
#[must_use]
pub fn messages_region(viewer_id: Uuid, chat: &Chat, flash: Option<&str>) -> String {
    let mut out = String::new();

    if let Some(message) = flash {
        out.push_str(&format!(
            r#"            <div class="error-message">{}</div>
"#,
            escape(message)
        ));
    }

    if chat.messages.is_empty() {
        out.push_str(
            r#"            <div class="no-messages"><p>No messages in this chat yet. Start the conversation!</p></div>"#,
        );
    } else {
        for msg in &chat.messages {
            out.push_str(&message_item(viewer_id, msg));
            out.push('\n');
        }
    }
    out
}

fn message_item(viewer_id: Uuid, msg: &ChatMessage) -> String {
    // Bot replies are stored under the user's own id; rendering falls back
    // to "Bot" only for rows written by anyone else.
    let (class, author) = if msg.user_id == viewer_id {
        ("user-message", "You")
    } else {
        ("bot-message", "Bot")
    };
    format!(
        r#"            <div class="message {class}">
                <div class="message-content">{content}</div>
                <div class="message-info">{author} • {time}</div>
            </div>"#,
        content = escape(&msg.content),
        time = msg.created_at.format("%H:%M:%S"),
    )
}

// ─────────────────────────────────────────────────────────────────────────────
// Errors
// ─────────────────────────────────────────────────────────────────────────────

/// Standalone error banner, swapped into a fragment target.
#[must_use]
pub fn region_error(message: &str) -> String {
    format!(
        r#"<div class="error-message">{}</div>"#,
        escape(message)
    )
}

/// Blocking error page for failed mutations: the alert() equivalent.
#[must_use]
pub fn error_page(message: &str) -> String {
    let content = format!(
        r#"<div class="error-card">
    <h2>Something went wrong</h2>
    <p class="error-detail">{}</p>
    <a href="/chats" class="link-button">Back to chats</a>
</div>"#,
        escape(message)
    );
    html_shell("Error", &content)
}
