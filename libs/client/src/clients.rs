use afiya_proto::constants::uri;
use afiya_proto::v1::{Client, ClientCreate, ClientUpdate, EnrollRequest};
use url::Url;

use crate::{AfiyaClient, ClientError, RequestOptions};

impl AfiyaClient {
    pub async fn client_list(&self) -> Result<Vec<Client>, ClientError> {
        self.perform_get_request(uri::AFIYA_CLIENTS).await
    }

    /// Search clients by name. A blank query lists everyone.
    pub async fn client_search(&self, query: &str) -> Result<Vec<Client>, ClientError> {
        let query = query.trim();
        if query.is_empty() {
            return self.client_list().await;
        }

        let mut url = Url::parse(&self.endpoint(uri::AFIYA_CLIENTS_SEARCH)).map_err(|e| {
            error!(?e, "failed to build search url");
            ClientError::InvalidInput(format!("Invalid search url: {}", e))
        })?;
        url.query_pairs_mut().append_pair("q", query);

        let body = self.send(url.as_str(), RequestOptions::default()).await?;
        Self::decode(body)
    }

    pub async fn client_get(&self, id: u64) -> Result<Client, ClientError> {
        self.perform_get_request(&uri::afiya_client(id)).await
    }

    pub async fn client_create(&self, new_client: &ClientCreate) -> Result<Client, ClientError> {
        self.perform_post_request(uri::AFIYA_CLIENTS, new_client)
            .await
    }

    pub async fn client_update(
        &self,
        id: u64,
        update: &ClientUpdate,
    ) -> Result<Client, ClientError> {
        self.perform_patch_request(&uri::afiya_client(id), update)
            .await
    }

    /// Enroll a client in a program, returning the client as it now stands.
    pub async fn client_enroll(&self, id: u64, program_id: u64) -> Result<Client, ClientError> {
        self.perform_post_request(&uri::afiya_client_enroll(id), &EnrollRequest { program_id })
            .await
    }
}
