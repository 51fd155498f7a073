//! Explicit UI state and the pure function that turns it into a view.

use shared::{
    domain::{PostAction, PostId, SessionState},
    protocol::Post,
};

pub const EMPTY_POSTS_MESSAGE: &str = "No posts available.";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PostList {
    /// Nothing fetched yet.
    #[default]
    NotLoaded,
    Loaded(Vec<Post>),
}

impl PostList {
    pub fn find(&self, post_id: PostId) -> Option<&Post> {
        match self {
            Self::NotLoaded => None,
            Self::Loaded(posts) => posts.iter().find(|post| post.id == post_id),
        }
    }
}

/// Everything the controller knows; mutated only by the controller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UiState {
    pub session: SessionState,
    pub posts: PostList,
    pub draft: String,
}

impl UiState {
    /// Capability flags come from the backend; a post that isn't in the
    /// loaded list grants nothing.
    pub fn permits(&self, post_id: PostId, action: PostAction) -> bool {
        self.posts.find(post_id).is_some_and(|post| match action {
            PostAction::Delete => post.can_delete,
            PostAction::Edit => post.can_edit,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionVisibility {
    pub login_form: bool,
    pub register_form: bool,
    pub logout_control: bool,
    pub content_area: bool,
    pub create_post_form: bool,
}

impl RegionVisibility {
    pub const fn for_session(session: SessionState) -> Self {
        let authenticated = matches!(session, SessionState::Authenticated);
        Self {
            login_form: !authenticated,
            register_form: !authenticated,
            logout_control: authenticated,
            content_area: authenticated,
            create_post_form: authenticated,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostView {
    pub id: PostId,
    pub content: String,
    pub byline: String,
    pub deletable: bool,
    pub editable: bool,
}

impl From<&Post> for PostView {
    fn from(post: &Post) -> Self {
        Self {
            id: post.id,
            content: post.content.clone(),
            byline: format!(
                "By {} on {} UTC",
                post.author,
                post.created_at.format("%Y-%m-%d %H:%M")
            ),
            deletable: post.can_delete,
            editable: post.can_edit,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostListView {
    Loading,
    Empty { message: &'static str },
    Items(Vec<PostView>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct View {
    pub session: SessionState,
    pub regions: RegionVisibility,
    pub posts: PostListView,
    pub draft: String,
}

pub fn render(state: &UiState) -> View {
    let posts = match &state.posts {
        PostList::NotLoaded => PostListView::Loading,
        PostList::Loaded(posts) if posts.is_empty() => PostListView::Empty {
            message: EMPTY_POSTS_MESSAGE,
        },
        PostList::Loaded(posts) => PostListView::Items(posts.iter().map(PostView::from).collect()),
    };

    View {
        session: state.session,
        regions: RegionVisibility::for_session(state.session),
        posts,
        draft: state.draft.clone(),
    }
}

#[cfg(test)]
#[path = "tests/render_tests.rs"]
mod tests;
