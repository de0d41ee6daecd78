//! HTML admin views.

use super::AppState;
use axum::{extract::State, response::Html};
use registration_store::RegistrationRecord;

const BACK_LINK: &str = r#"<a href="/">Back to Dashboard</a>"#;

/// GET /
pub async fn dashboard() -> Html<&'static str> {
    Html(
        r#"<h1>Admin Dashboard</h1>
<p>Welcome to the Admin Panel. Use the options below:</p>
<ul>
    <li><a href="/view_users">View Registered Users</a></li>
    <li><a href="/view_pending_users">View Pending Users</a></li>
    <li><a href="/delete_user_form">Delete a User</a></li>
</ul>
"#,
    )
}

/// GET /view_users
pub async fn view_users(State(state): State<AppState>) -> Html<String> {
    let users = state.store.list_registered().await;
    if users.is_empty() {
        return Html(format!("<h2>No registered users.</h2>{BACK_LINK}"));
    }

    let items: String = users
        .iter()
        .map(|(computer_id, record)| {
            format!(
                r#"
        <li>
            {details}
            {unregister}
        </li>"#,
                details = record_details(computer_id, record),
                unregister = action_button("/unregister_user", computer_id, "Unregister"),
            )
        })
        .collect();

    Html(format!(
        "<h2>Registered Users</h2>\n<ul>{items}\n</ul>\n{BACK_LINK}"
    ))
}

/// GET /view_pending_users
pub async fn view_pending_users(State(state): State<AppState>) -> Html<String> {
    let users = state.store.list_pending().await;
    if users.is_empty() {
        return Html(format!("<h2>No pending users.</h2>{BACK_LINK}"));
    }

    let items: String = users
        .iter()
        .map(|(computer_id, record)| {
            format!(
                r#"
        <li>
            {details}
            {approve}
            {reject}
        </li>"#,
                details = record_details(computer_id, record),
                approve = action_button("/approve_user", computer_id, "Approve"),
                reject = action_button("/reject_user", computer_id, "Reject"),
            )
        })
        .collect();

    Html(format!(
        "<h2>Pending Users</h2>\n<ul>{items}\n</ul>\n{BACK_LINK}"
    ))
}

/// GET /delete_user_form
pub async fn delete_user_form() -> Html<String> {
    Html(format!(
        r#"<h2>Delete a User</h2>
<form action="/delete_user" method="post">
    <label>Computer ID: <input type="text" name="computer_id" required></label><br>
    <label>Admin Username: <input type="text" name="admin_username" required></label><br>
    <label>Admin Password: <input type="password" name="admin_password" required></label><br>
    <button type="submit">Delete User</button>
</form>
{BACK_LINK}"#
    ))
}

fn record_details(computer_id: &str, record: &RegistrationRecord) -> String {
    let mut details = format!(
        "Username: {}, Computer ID: {}, App Version: {}",
        escape_html(&record.username),
        escape_html(computer_id),
        escape_html(&record.app_version),
    );
    if let Some(submitted_at) = record.submitted_at {
        details.push_str(&format!(
            ", Submitted: {}",
            submitted_at.format("%Y-%m-%d %H:%M UTC")
        ));
    }
    details
}

fn action_button(action: &str, computer_id: &str, label: &str) -> String {
    format!(
        r#"<form action="{action}" method="post" style="display:inline;">
                <input type="hidden" name="computer_id" value="{id}">
                <button type="submit">{label}</button>
            </form>"#,
        id = escape_html(computer_id),
    )
}

fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}
