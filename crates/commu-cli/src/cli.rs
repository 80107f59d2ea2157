//! CLI argument definitions.

use clap::{Args, Parser, Subcommand, ValueEnum};

use commu_core::SortOrder;
use commu_sync::paginate::ViewportClass;

use crate::commands::tags::TagsCommand;

/// Commu community CLI.
#[derive(Parser, Debug)]
#[command(name = "commu")]
#[command(author, version = env!("COMMU_VERSION"), about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Output logs as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// API base URL (defaults to the logged-in backend, then localhost)
    #[arg(long, env = "COMMU_API_URL", global = true)]
    pub api: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Log in and store the session
    Login(LoginArgs),

    /// Show the logged-in user
    Whoami,

    /// Forget the stored session
    Logout,

    /// List posts
    Feed(FeedArgs),

    /// Show a post
    Post(PostArgs),

    /// Comment on a post
    Comment(CommentArgs),

    /// Like or unlike a post
    Like(ToggleArgs),

    /// Bookmark a post or remove its bookmark
    Bookmark(ToggleArgs),

    /// List channels
    Channels,

    /// Show a user profile
    User(UserArgs),

    /// Tag lookups
    Tags(TagsCommand),
}

#[derive(Args, Debug)]
pub struct LoginArgs {
    #[arg(long)]
    pub email: String,

    #[arg(long)]
    pub password: String,
}

#[derive(Args, Debug)]
pub struct FeedArgs {
    /// Posts of a channel
    #[arg(long, conflicts_with_all = ["author", "tag", "search", "mine"])]
    pub channel: Option<String>,

    /// Posts of a user
    #[arg(long, conflicts_with_all = ["tag", "search", "mine"])]
    pub author: Option<String>,

    /// Posts with a tag
    #[arg(long, conflicts_with_all = ["search", "mine"])]
    pub tag: Option<String>,

    /// Full-text search
    #[arg(long, conflicts_with = "mine")]
    pub search: Option<String>,

    /// Your own activity (requires login)
    #[arg(long, value_enum)]
    pub mine: Option<Mine>,

    #[arg(long, value_enum, default_value_t = Sort::Latest)]
    pub sort: Sort,

    /// Page to show on desktop and tablet
    #[arg(long, default_value_t = 1)]
    pub page: u32,

    #[arg(long, default_value_t = 20)]
    pub limit: u32,

    /// Device class; mobile scrolls through every page
    #[arg(long, value_enum, default_value_t = Device::Desktop)]
    pub device: Device,

    /// Output posts as JSON lines
    #[arg(long)]
    pub json: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum Mine {
    Posts,
    Likes,
    Bookmarks,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum Sort {
    Latest,
    Popular,
    Comments,
}

impl From<Sort> for SortOrder {
    fn from(sort: Sort) -> Self {
        match sort {
            Sort::Latest => SortOrder::Latest,
            Sort::Popular => SortOrder::Popular,
            Sort::Comments => SortOrder::Comments,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum Device {
    Mobile,
    Tablet,
    Desktop,
}

impl From<Device> for ViewportClass {
    fn from(device: Device) -> Self {
        match device {
            Device::Mobile => ViewportClass::Mobile,
            Device::Tablet => ViewportClass::Tablet,
            Device::Desktop => ViewportClass::Desktop,
        }
    }
}

#[derive(Args, Debug)]
pub struct PostArgs {
    pub id: String,

    /// Also list the comments
    #[arg(long)]
    pub comments: bool,
}

#[derive(Args, Debug)]
pub struct CommentArgs {
    pub id: String,

    pub text: String,
}

#[derive(Args, Debug)]
pub struct ToggleArgs {
    pub id: String,
}

#[derive(Args, Debug)]
pub struct UserArgs {
    pub username: String,
}
