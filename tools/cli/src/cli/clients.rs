use std::process::ExitCode;
use std::sync::Arc;

use afiya_client::dashboard::{ClientDetail, ClientForm, Dashboard};
use serde_json::json;

use crate::common::report_error;
use crate::{ClientCreateOpt, ClientOpt, ClientUpdateOpt, CommonOpt, OutputMode};

fn print_detail(output_mode: OutputMode, detail: &ClientDetail) {
    match output_mode {
        OutputMode::Json => {
            let out = json!({
                "id": detail.id,
                "name": detail.name,
                "date_of_birth": detail.date_of_birth,
                "contact": detail.contact,
                "enrolled_programs": detail.enrolled_programs,
                "available_programs": detail.available_programs,
            });
            println!("{}", out);
        }
        OutputMode::Text => {
            println!("id: {}", detail.id);
            println!("name: {}", detail.name);
            println!("date_of_birth: {}", detail.date_of_birth);
            println!("contact: {}", detail.contact);
            if detail.enrolled_programs.is_empty() {
                println!("enrolled_programs: none");
            } else {
                println!("enrolled_programs:");
                for p in &detail.enrolled_programs {
                    println!("  {}", p);
                }
            }
            let available: Vec<_> = detail
                .available_programs
                .iter()
                .filter(|p| !detail.enrolled_programs.iter().any(|e| e.id == p.id))
                .collect();
            if !available.is_empty() {
                println!("available_programs:");
                for p in available {
                    println!("  {}", p);
                }
            }
        }
    }
}

async fn dashboard(copt: &CommonOpt) -> Dashboard {
    Dashboard::new(Arc::new(copt.to_client().await))
}

impl ClientOpt {
    pub fn debug(&self) -> bool {
        match self {
            ClientOpt::List(copt) => copt.debug,
            ClientOpt::Search { copt, .. }
            | ClientOpt::Get { copt, .. }
            | ClientOpt::Show { copt, .. }
            | ClientOpt::Enroll { copt, .. } => copt.debug,
            ClientOpt::Create(opt) => opt.copt.debug,
            ClientOpt::Update(opt) => opt.copt.debug,
        }
    }

    pub async fn exec(&self) -> ExitCode {
        match self {
            ClientOpt::List(copt) => {
                let mut dash = dashboard(copt).await;
                match dash.refresh_clients().await {
                    Ok(clients) => {
                        if clients.is_empty() {
                            eprintln!("No clients found.");
                        }
                        for client in clients {
                            copt.output_mode.print_message(client);
                        }
                        ExitCode::SUCCESS
                    }
                    Err(e) => report_error(dash.client(), e).await,
                }
            }
            ClientOpt::Search { copt, query } => {
                let mut dash = dashboard(copt).await;
                match dash.search_clients(query).await {
                    Ok(outcome) => {
                        eprintln!("{}", outcome.status);
                        for client in outcome.clients {
                            copt.output_mode.print_message(client);
                        }
                        ExitCode::SUCCESS
                    }
                    Err(e) => report_error(dash.client(), e).await,
                }
            }
            ClientOpt::Get { copt, id } => {
                let client = copt.to_client().await;
                match client.client_get(*id).await {
                    Ok(found) => {
                        copt.output_mode.print_message(found);
                        ExitCode::SUCCESS
                    }
                    Err(e) => report_error(&client, e).await,
                }
            }
            ClientOpt::Show { copt, id } => {
                let mut dash = dashboard(copt).await;
                match dash.show_client_detail(*id).await {
                    Ok(detail) => {
                        print_detail(copt.output_mode, &detail);
                        ExitCode::SUCCESS
                    }
                    Err(e) => report_error(dash.client(), e).await,
                }
            }
            ClientOpt::Create(opt) => opt.exec().await,
            ClientOpt::Update(opt) => opt.exec().await,
            ClientOpt::Enroll {
                copt,
                id,
                program_id,
            } => {
                let mut dash = dashboard(copt).await;
                if let Err(e) = dash.show_client_detail(*id).await {
                    return report_error(dash.client(), e).await;
                }
                match dash.enroll_selected(Some(*program_id)).await {
                    Ok(outcome) => {
                        println!("{}", outcome.message);
                        ExitCode::SUCCESS
                    }
                    Err(e) => report_error(dash.client(), e).await,
                }
            }
        }
    }
}

impl ClientCreateOpt {
    pub async fn exec(&self) -> ExitCode {
        let mut dash = dashboard(&self.copt).await;
        let form = ClientForm {
            name: self.name.clone(),
            date_of_birth: self.date_of_birth.clone(),
            contact_info: self.contact.clone().unwrap_or_default(),
        };
        match dash.register_client(&form).await {
            Ok(client) => {
                self.copt.output_mode.print_message(client);
                ExitCode::SUCCESS
            }
            Err(e) => report_error(dash.client(), e).await,
        }
    }
}

impl ClientUpdateOpt {
    pub async fn exec(&self) -> ExitCode {
        let mut dash = dashboard(&self.copt).await;

        // Start from what the backend has, as the edit form would.
        let mut form = match dash.load_client_for_edit(self.id).await {
            Ok(form) => form,
            Err(e) => return report_error(dash.client(), e).await,
        };
        if let Some(name) = &self.name {
            form.name.clone_from(name);
        }
        if let Some(date_of_birth) = &self.date_of_birth {
            form.date_of_birth.clone_from(date_of_birth);
        }
        if let Some(contact) = &self.contact {
            form.contact_info.clone_from(contact);
        }

        match dash.edit_client(self.id, &form).await {
            Ok(outcome) => {
                self.copt.output_mode.print_message(outcome.client);
                ExitCode::SUCCESS
            }
            Err(e) => report_error(dash.client(), e).await,
        }
    }
}
