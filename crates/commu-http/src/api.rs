//! [`Api`] over HTTP.

use async_trait::async_trait;
use tracing::{debug, info, instrument};

use commu_core::error::AuthError;
use commu_core::{
    AccessToken, Api, ApiUrl, AuthSession, Channel, Comment, Credentials, Error, Page,
    PageRequest, Post, PostFilters, PostId, Result, Tag, ToggleOutcome, UserProfile, Username,
};

use crate::client::ApiClient;
use crate::endpoints::*;

/// The Commu REST API.
#[derive(Debug, Clone)]
pub struct HttpApi {
    client: ApiClient,
}

impl HttpApi {
    pub fn new(base: ApiUrl) -> Result<Self> {
        Ok(Self {
            client: ApiClient::new(base)?,
        })
    }

    pub fn with_client(client: ApiClient) -> Self {
        Self { client }
    }

    /// Resume a stored session.
    pub fn with_token(self, token: AccessToken) -> Self {
        self.client.set_token(Some(token));
        self
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    /// Forget the access token.
    pub fn logout(&self) {
        self.client.set_token(None);
    }

    fn require_session(&self) -> Result<()> {
        if self.client.has_token() {
            Ok(())
        } else {
            Err(AuthError::NotLoggedIn.into())
        }
    }

    async fn list<T>(&self, path: &str, query: &[(&str, String)], request: &PageRequest) -> Result<Page<T>>
    where
        T: serde::de::DeserializeOwned,
    {
        let (items, meta) = self.client.get::<Vec<T>>(path, query).await?;
        Ok(Page::from_response(items, meta, request))
    }

    async fn toggle(&self, path: String, active: bool) -> Result<ToggleOutcome> {
        self.require_session()?;
        if active {
            self.client.post_empty(&path).await
        } else {
            self.client.delete(&path).await
        }
    }
}

#[async_trait]
impl Api for HttpApi {
    #[instrument(skip(self, credentials), fields(email = %credentials.email()))]
    async fn login(&self, credentials: &Credentials) -> Result<AuthSession> {
        info!("Logging in");
        let request = LoginRequest {
            email: credentials.email(),
            password: credentials.password(),
        };

        let session: AuthSession = match self.client.post(LOGIN, &request).await {
            Ok(session) => session,
            Err(Error::Auth(_)) => {
                return Err(AuthError::InvalidCredentials(credentials.email().to_string()).into());
            }
            Err(err) => return Err(err),
        };

        self.client.set_token(Some(session.access_token.clone()));
        debug!(username = %session.user.username, "Logged in");
        Ok(session)
    }

    #[instrument(skip(self))]
    async fn me(&self) -> Result<UserProfile> {
        self.require_session()?;
        self.client.get(ME, &[]).await.map(|(user, _)| user)
    }

    #[instrument(skip(self), fields(scope = ?filters.scope, sort = filters.sort.as_str()))]
    async fn list_posts(&self, filters: &PostFilters, request: PageRequest) -> Result<Page<Post>> {
        if filters.scope.requires_auth() {
            self.require_session()?;
        }
        let query = posts_query(filters, &request);
        self.list(&posts_path(&filters.scope), &query, &request).await
    }

    #[instrument(skip(self), fields(%id))]
    async fn get_post(&self, id: &PostId) -> Result<Post> {
        self.client.get(&post_path(id), &[]).await.map(|(post, _)| post)
    }

    #[instrument(skip(self), fields(%post))]
    async fn list_comments(&self, post: &PostId, request: PageRequest) -> Result<Page<Comment>> {
        let query = request.query_pairs();
        self.list(&comments_path(post), &query, &request).await
    }

    #[instrument(skip(self, content), fields(%post))]
    async fn create_comment(&self, post: &PostId, content: &str) -> Result<Comment> {
        self.require_session()?;
        self.client
            .post(&comments_path(post), &CreateCommentRequest { content })
            .await
    }

    #[instrument(skip(self), fields(%post))]
    async fn set_like(&self, post: &PostId, liked: bool) -> Result<ToggleOutcome> {
        self.toggle(like_path(post), liked).await
    }

    #[instrument(skip(self), fields(%post))]
    async fn set_bookmark(&self, post: &PostId, bookmarked: bool) -> Result<ToggleOutcome> {
        self.toggle(bookmark_path(post), bookmarked).await
    }

    #[instrument(skip(self))]
    async fn list_channels(&self) -> Result<Vec<Channel>> {
        self.client.get(CHANNELS, &[]).await.map(|(channels, _)| channels)
    }

    #[instrument(skip(self), fields(%username))]
    async fn get_user(&self, username: &Username) -> Result<UserProfile> {
        self.client.get(&user_path(username), &[]).await.map(|(user, _)| user)
    }

    #[instrument(skip(self))]
    async fn search_tags(&self, query: &str, limit: u32) -> Result<Vec<Tag>> {
        let params = [("q", query.to_string()), ("limit", limit.to_string())];
        self.client.get(TAG_SEARCH, &params).await.map(|(tags, _)| tags)
    }

    #[instrument(skip(self))]
    async fn popular_tags(&self, limit: u32) -> Result<Vec<Tag>> {
        let params = [("limit", limit.to_string())];
        self.client.get(POPULAR_TAGS, &params).await.map(|(tags, _)| tags)
    }
}
