use afiya_proto::constants::uri;
use afiya_proto::v1::{Program, ProgramCreate};

use crate::{AfiyaClient, ClientError};

impl AfiyaClient {
    pub async fn program_list(&self) -> Result<Vec<Program>, ClientError> {
        self.perform_get_request(uri::AFIYA_PROGRAMS).await
    }

    pub async fn program_get(&self, id: u64) -> Result<Program, ClientError> {
        self.perform_get_request(&uri::afiya_program(id)).await
    }

    pub async fn program_create(&self, name: &str) -> Result<Program, ClientError> {
        let new_program = ProgramCreate {
            name: name.to_string(),
        };
        self.perform_post_request(uri::AFIYA_PROGRAMS, &new_program)
            .await
    }
}
