//! Plain-text rendering of controller views and notices.

use std::fmt::Write as _;

use client_core::{Notice, NoticeLevel, PostListView, View};
use shared::protocol::Post;

pub fn render_view(view: &View) -> String {
    let mut out = String::new();
    let regions = view.regions;
    let _ = writeln!(out, "== session: {:?}", view.session);

    let mut controls = Vec::new();
    if regions.login_form {
        controls.push("login");
    }
    if regions.register_form {
        controls.push("register");
    }
    if regions.logout_control {
        controls.push("logout");
    }
    if regions.create_post_form {
        controls.push("draft/post");
    }
    let _ = writeln!(out, "   available: {}", controls.join(", "));

    if !regions.content_area {
        out.push_str("   (log in to see posts)");
        return out;
    }

    if !view.draft.is_empty() {
        let _ = writeln!(out, "   draft: {}", view.draft);
    }
    match &view.posts {
        PostListView::Loading => out.push_str("   loading posts..."),
        PostListView::Empty { message } => {
            let _ = write!(out, "   {message}");
        }
        PostListView::Items(items) => {
            let lines: Vec<String> = items
                .iter()
                .map(|item| {
                    let mut flags = Vec::new();
                    if item.editable {
                        flags.push("edit");
                    }
                    if item.deletable {
                        flags.push("delete");
                    }
                    let flags = if flags.is_empty() {
                        String::new()
                    } else {
                        format!(" [{}]", flags.join("|"))
                    };
                    format!("   #{} {}\n      {}{flags}", item.id, item.content, item.byline)
                })
                .collect();
            out.push_str(&lines.join("\n"));
        }
    }
    out
}

pub fn render_notice(notice: &Notice) -> String {
    match notice.level {
        NoticeLevel::Info => format!("* {}", notice.message),
        NoticeLevel::Error => format!("! {:?}: {}", notice.context, notice.message),
    }
}

pub fn render_post(post: &Post) -> String {
    format!(
        "#{} by {} at {}\n{}",
        post.id,
        post.author,
        post.created_at.to_rfc3339(),
        post.content
    )
}
