use crate::{Category, GatewayError, PhotoCategories, RemoteGateway, Session, SignUp, User};
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use url::Url;

const PREFER_UPSERT: &str = "resolution=merge-duplicates,return=minimal";

#[derive(Debug, Serialize)]
struct Credentials<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
struct SignUpRequest<'a> {
    email: &'a str,
    password: &'a str,
    data: SignUpData<'a>,
}

#[derive(Debug, Serialize)]
struct SignUpData<'a> {
    display_name: &'a str,
}

// GoTrue answers sign-up with a full session when auto-confirm is on and
// with the bare user otherwise.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SignUpResponse {
    WithSession(Session),
    UserOnly(User),
}

#[derive(Debug, Serialize)]
struct FavoriteRow<'a> {
    user_id: &'a str,
    photo_id: &'a str,
    is_favorite: bool,
}

#[derive(Debug, Deserialize)]
struct FavoriteIdRow {
    photo_id: String,
}

#[derive(Debug, Serialize)]
struct PhotoCategoriesRow<'a> {
    user_id: &'a str,
    photo_id: &'a str,
    categories: &'a [String],
}

#[derive(Debug, Serialize)]
struct UserCategoriesRow<'a> {
    user_id: &'a str,
    categories: &'a [Category],
}

#[derive(Debug, Deserialize)]
struct UserCategoriesResponse {
    #[serde(default)]
    categories: Option<Vec<Category>>,
}

/// Client for a Supabase project: GoTrue for accounts, PostgREST for data.
pub struct SupabaseClient {
    client: reqwest::Client,
    base_url: Url,
    api_key: String,
}

impl SupabaseClient {
    pub fn new(base_url: &str, api_key: String) -> Result<Self, GatewayError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| GatewayError::Request(format!("Invalid backend URL: {}", e)))?;
        Ok(SupabaseClient {
            client: reqwest::Client::new(),
            base_url,
            api_key,
        })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    fn endpoint(&self, path: &str) -> Result<Url, GatewayError> {
        self.base_url
            .join(path)
            .map_err(|e| GatewayError::Request(format!("Invalid endpoint {}: {}", path, e)))
    }

    fn table(&self, table: &str, session: &Session) -> Result<Url, GatewayError> {
        let mut url = self.endpoint(&format!("/rest/v1/{}", table))?;
        url.query_pairs_mut()
            .append_pair("user_id", &format!("eq.{}", session.user_id()));
        Ok(url)
    }

    fn request(&self, method: Method, url: Url, bearer: &str) -> RequestBuilder {
        self.client
            .request(method, url)
            .header("apikey", &self.api_key)
            .header(AUTHORIZATION, format!("Bearer {}", bearer))
    }

    fn upsert(&self, table: &str, conflict: &str, session: &Session) -> Result<RequestBuilder, GatewayError> {
        let mut url = self.endpoint(&format!("/rest/v1/{}", table))?;
        url.query_pairs_mut().append_pair("on_conflict", conflict);
        Ok(self
            .request(Method::POST, url, &session.access_token)
            .header(CONTENT_TYPE, "application/json")
            .header("Prefer", PREFER_UPSERT))
    }

    async fn send(builder: RequestBuilder) -> Result<Response, GatewayError> {
        let response = builder
            .send()
            .await
            .map_err(|e| GatewayError::Request(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(GatewayError::Auth(message));
        }
        Err(GatewayError::Api {
            status: status.as_u16(),
            message,
        })
    }

    async fn decode<T: serde::de::DeserializeOwned>(response: Response) -> Result<T, GatewayError> {
        response
            .json::<T>()
            .await
            .map_err(|e| GatewayError::Decode(e.to_string()))
    }
}

#[async_trait]
impl RemoteGateway for SupabaseClient {
    fn backend_tag(&self) -> &'static str {
        "supabase"
    }

    #[cfg_attr(feature = "trace-spans", tracing::instrument(skip(self, session)))]
    async fn get_user(&self, session: &Session) -> Result<User, GatewayError> {
        let url = self.endpoint("/auth/v1/user")?;
        let response = Self::send(self.request(Method::GET, url, &session.access_token)).await?;
        Self::decode(response).await
    }

    #[cfg_attr(feature = "trace-spans", tracing::instrument(skip(self, password)))]
    async fn create_user(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> Result<SignUp, GatewayError> {
        let url = self.endpoint("/auth/v1/signup")?;
        let body = SignUpRequest {
            email,
            password,
            data: SignUpData { display_name },
        };
        let response = Self::send(self.request(Method::POST, url, &self.api_key).json(&body)).await?;
        match Self::decode::<SignUpResponse>(response).await? {
            SignUpResponse::WithSession(session) => Ok(SignUp {
                user: session.user.clone(),
                session: Some(session),
            }),
            SignUpResponse::UserOnly(user) => Ok(SignUp { user, session: None }),
        }
    }

    #[cfg_attr(feature = "trace-spans", tracing::instrument(skip(self, password)))]
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, GatewayError> {
        let mut url = self.endpoint("/auth/v1/token")?;
        url.query_pairs_mut().append_pair("grant_type", "password");
        let builder = self
            .request(Method::POST, url, &self.api_key)
            .json(&Credentials { email, password });
        let response = match Self::send(builder).await {
            Ok(r) => r,
            // GoTrue reports bad credentials as 400 invalid_grant
            Err(GatewayError::Api { status: 400, message }) => return Err(GatewayError::Auth(message)),
            Err(e) => return Err(e),
        };
        Self::decode(response).await
    }

    async fn sign_out(&self, session: &Session) -> Result<(), GatewayError> {
        let url = self.endpoint("/auth/v1/logout")?;
        Self::send(self.request(Method::POST, url, &session.access_token)).await?;
        Ok(())
    }

    #[cfg_attr(feature = "trace-spans", tracing::instrument(skip(self, session)))]
    async fn upsert_favorite(
        &self,
        session: &Session,
        photo_id: &str,
        is_favorite: bool,
    ) -> Result<(), GatewayError> {
        let row = FavoriteRow {
            user_id: session.user_id(),
            photo_id,
            is_favorite,
        };
        let builder = self.upsert("photo_favorites", "user_id,photo_id", session)?;
        Self::send(builder.json(&[row])).await?;
        Ok(())
    }

    async fn list_favorites(&self, session: &Session) -> Result<Vec<String>, GatewayError> {
        let mut url = self.table("photo_favorites", session)?;
        url.query_pairs_mut()
            .append_pair("is_favorite", "eq.true")
            .append_pair("select", "photo_id");
        let response = Self::send(self.request(Method::GET, url, &session.access_token)).await?;
        let rows: Vec<FavoriteIdRow> = Self::decode(response).await?;
        Ok(rows.into_iter().map(|r| r.photo_id).collect())
    }

    #[cfg_attr(feature = "trace-spans", tracing::instrument(skip(self, session)))]
    async fn upsert_photo_categories(
        &self,
        session: &Session,
        photo_id: &str,
        categories: &[String],
    ) -> Result<(), GatewayError> {
        let row = PhotoCategoriesRow {
            user_id: session.user_id(),
            photo_id,
            categories,
        };
        let builder = self.upsert("photo_categories", "user_id,photo_id", session)?;
        Self::send(builder.json(&[row])).await?;
        Ok(())
    }

    async fn list_photo_categories(
        &self,
        session: &Session,
        photo_id: Option<&str>,
    ) -> Result<Vec<PhotoCategories>, GatewayError> {
        let mut url = self.table("photo_categories", session)?;
        {
            let mut query = url.query_pairs_mut();
            if let Some(id) = photo_id {
                query.append_pair("photo_id", &format!("eq.{}", id));
            }
            query.append_pair("select", "photo_id,categories");
        }
        let response = Self::send(self.request(Method::GET, url, &session.access_token)).await?;
        Self::decode(response).await
    }

    async fn get_user_categories(
        &self,
        session: &Session,
    ) -> Result<Option<Vec<Category>>, GatewayError> {
        let mut url = self.table("user_categories", session)?;
        url.query_pairs_mut().append_pair("select", "categories");
        let response = Self::send(self.request(Method::GET, url, &session.access_token)).await?;
        let rows: Vec<UserCategoriesResponse> = Self::decode(response).await?;
        Ok(rows.into_iter().next().and_then(|r| r.categories))
    }

    #[cfg_attr(feature = "trace-spans", tracing::instrument(skip(self, session, categories)))]
    async fn set_user_categories(
        &self,
        session: &Session,
        categories: &[Category],
    ) -> Result<(), GatewayError> {
        let row = UserCategoriesRow {
            user_id: session.user_id(),
            categories,
        };
        let builder = self.upsert("user_categories", "user_id", session)?;
        Self::send(builder.json(&[row])).await?;
        Ok(())
    }
}
