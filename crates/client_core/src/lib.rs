//! Client side of the blog: backend seam, session-gated controller and the
//! pure render step that turns controller state into a view.

pub mod api;
pub mod config;
pub mod controller;
pub mod error;
pub mod render;

pub use api::{BlogApi, HttpBlogApi};
pub use config::{load_settings, ClientSettings};
pub use controller::{ControllerEvent, Notice, NoticeContext, NoticeLevel, SessionController};
pub use error::{ClientError, ErrorKind};
pub use render::{render, PostList, PostListView, PostView, RegionVisibility, UiState, View};
