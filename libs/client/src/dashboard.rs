//! The dashboard page: programs, clients and the client detail view.
//!
//! The controller holds the page state and drives each flow through the
//! client. It produces data and alerts, rendering is left to the caller.

use std::sync::Arc;

use afiya_proto::v1::{Client, ClientCreate, ClientUpdate, Program};

use crate::{AfiyaClient, Alert, ClientError};

#[derive(Debug, Default, Clone)]
pub struct DashboardState {
    pub programs: Vec<Program>,
    pub clients: Vec<Client>,
    /// The client shown in the detail view, if it is open.
    pub selected_client: Option<u64>,
}

/// The values of the register and edit client forms, as entered.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ClientForm {
    pub name: String,
    pub date_of_birth: String,
    pub contact_info: String,
}

impl ClientForm {
    fn validate(&self) -> Result<ClientCreate, ClientError> {
        let name = self.name.trim();
        let date_of_birth = self.date_of_birth.trim();
        if name.is_empty() || date_of_birth.is_empty() {
            return Err(ClientError::InvalidInput(
                "Name and Date of Birth are required.".to_string(),
            ));
        }
        let contact_info = Some(self.contact_info.trim())
            .filter(|c| !c.is_empty())
            .map(str::to_string);
        Ok(ClientCreate {
            name: name.to_string(),
            date_of_birth: date_of_birth.to_string(),
            contact_info,
        })
    }
}

impl From<&Client> for ClientForm {
    fn from(client: &Client) -> Self {
        ClientForm {
            name: client.name.clone(),
            date_of_birth: client.date_of_birth.clone(),
            contact_info: client.contact_info.clone().unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientDetail {
    pub id: u64,
    pub name: String,
    pub date_of_birth: String,
    pub contact: String,
    pub enrolled_programs: Vec<Program>,
    /// Every program, for the enrollment picker.
    pub available_programs: Vec<Program>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchOutcome {
    pub status: String,
    pub clients: Vec<Client>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditOutcome {
    pub client: Client,
    /// The refreshed detail view, when the edited client was the one open.
    pub detail: Option<ClientDetail>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrollOutcome {
    pub message: String,
    pub enrolled_programs: Vec<Program>,
}

pub struct Dashboard {
    client: Arc<AfiyaClient>,
    state: DashboardState,
}

impl Dashboard {
    pub fn new(client: Arc<AfiyaClient>) -> Self {
        Dashboard {
            client,
            state: DashboardState::default(),
        }
    }

    pub fn client(&self) -> &Arc<AfiyaClient> {
        &self.client
    }

    pub fn state(&self) -> &DashboardState {
        &self.state
    }

    /// Confirm the session is live and load the page. Returns the welcome line.
    pub async fn check_authentication(&mut self) -> Result<String, ClientError> {
        let profile = self.client.whoami().await?;
        let welcome = format!("Welcome, {}!", profile.greeting_name());
        debug!(username = %profile.username, "authenticated");

        self.refresh_programs().await?;
        self.refresh_clients().await?;
        Ok(welcome)
    }

    pub async fn refresh_programs(&mut self) -> Result<&[Program], ClientError> {
        self.state.programs = self.client.program_list().await?;
        Ok(&self.state.programs)
    }

    /// Reload the client list. This closes the detail view.
    pub async fn refresh_clients(&mut self) -> Result<&[Client], ClientError> {
        self.hide_client_detail();
        self.state.clients = self.client.client_list().await?;
        Ok(&self.state.clients)
    }

    pub async fn create_program(&mut self, name: &str) -> Result<Program, ClientError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ClientError::InvalidInput(
                "Program name cannot be empty.".to_string(),
            ));
        }

        let program = self.client.program_create(name).await?;
        self.client.notifier().notify(Alert::success(format!(
            "Program \"{}\" created successfully!",
            program.name
        )));

        if let Err(e) = self.refresh_programs().await {
            warn!(?e, "failed to refresh programs after create");
        }
        Ok(program)
    }

    pub async fn search_clients(&mut self, query: &str) -> Result<SearchOutcome, ClientError> {
        let query = query.trim();
        self.hide_client_detail();
        let clients = self.client.client_search(query).await?;
        self.state.clients = clients.clone();

        let status = if query.is_empty() {
            "Showing all clients.".to_string()
        } else {
            format!("Showing results for \"{}\"", query)
        };
        Ok(SearchOutcome { status, clients })
    }

    pub async fn register_client(&mut self, form: &ClientForm) -> Result<Client, ClientError> {
        let new_client = form.validate()?;
        let client = self.client.client_create(&new_client).await?;
        self.client.notifier().notify(Alert::success(format!(
            "Client \"{}\" registered successfully!",
            client.name
        )));

        if let Err(e) = self.refresh_clients().await {
            warn!(?e, "failed to refresh clients after register");
        }
        Ok(client)
    }

    /// Fetch a client to prefill the edit form.
    pub async fn load_client_for_edit(&self, id: u64) -> Result<ClientForm, ClientError> {
        match self.client.client_get(id).await {
            Ok(client) => Ok(ClientForm::from(&client)),
            Err(e) => {
                self.client.notifier().notify(Alert::danger(format!(
                    "Failed to load client data for editing: {}",
                    e
                )));
                Err(e)
            }
        }
    }

    pub async fn edit_client(
        &mut self,
        id: u64,
        form: &ClientForm,
    ) -> Result<EditOutcome, ClientError> {
        let ClientCreate {
            name,
            date_of_birth,
            contact_info,
        } = form.validate()?;
        let update = ClientUpdate {
            name,
            date_of_birth,
            contact_info,
        };

        let client = self.client.client_update(id, &update).await?;
        self.client.notifier().notify(Alert::success(format!(
            "Client \"{}\" updated successfully!",
            client.name
        )));

        // Refreshing the list closes the detail view, so note what was open first.
        let was_selected = self.state.selected_client == Some(id);

        if let Err(e) = self.refresh_clients().await {
            warn!(?e, "failed to refresh clients after edit");
        }

        let detail = if was_selected {
            match self.show_client_detail(id).await {
                Ok(detail) => Some(detail),
                Err(e) => {
                    warn!(?e, "failed to reload client detail after edit");
                    None
                }
            }
        } else {
            None
        };

        Ok(EditOutcome { client, detail })
    }

    /// Open the detail view for a client. The client and the program list are
    /// fetched together and either failure fails the whole view.
    pub async fn show_client_detail(&mut self, id: u64) -> Result<ClientDetail, ClientError> {
        self.state.selected_client = Some(id);

        let client = self.client.clone();
        let result = tokio::try_join!(client.client_get(id), client.program_list());

        match result {
            Ok((found, programs)) => {
                self.state.programs = programs.clone();
                Ok(ClientDetail {
                    id: found.id,
                    contact: found.contact_display().to_string(),
                    name: found.name,
                    date_of_birth: found.date_of_birth,
                    enrolled_programs: found.enrolled_programs,
                    available_programs: programs,
                })
            }
            Err(e) => {
                // A session expiry leaves the view as is, the redirect handles it.
                if !e.is_session_expired() {
                    self.hide_client_detail();
                }
                Err(e)
            }
        }
    }

    pub fn hide_client_detail(&mut self) {
        self.state.selected_client = None;
    }

    /// Enroll the client in the detail view in a program.
    pub async fn enroll_selected(
        &mut self,
        program_id: Option<u64>,
    ) -> Result<EnrollOutcome, ClientError> {
        let client_id = self
            .state
            .selected_client
            .ok_or_else(|| ClientError::InvalidInput("No client selected.".to_string()))?;
        let program_id = program_id.ok_or_else(|| {
            ClientError::InvalidInput("Please select a program to enroll.".to_string())
        })?;

        let updated = self.client.client_enroll(client_id, program_id).await?;
        let program_name = updated
            .enrolled_program(program_id)
            .map(|p| p.name.as_str())
            .unwrap_or("program");

        Ok(EnrollOutcome {
            message: format!("Successfully enrolled in {}!", program_name),
            enrolled_programs: updated.enrolled_programs,
        })
    }

    pub async fn logout(&mut self) -> Result<(), ClientError> {
        self.state = DashboardState::default();
        self.client.logout().await
    }
}
