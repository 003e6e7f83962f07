use std::process::ExitCode;
use std::sync::Arc;

use afiya_client::dashboard::Dashboard;

use crate::common::report_error;
use crate::ProgramOpt;

impl ProgramOpt {
    pub fn debug(&self) -> bool {
        match self {
            ProgramOpt::List(copt) => copt.debug,
            ProgramOpt::Get { copt, .. } | ProgramOpt::Create { copt, .. } => copt.debug,
        }
    }

    pub async fn exec(&self) -> ExitCode {
        match self {
            ProgramOpt::List(copt) => {
                let mut dashboard = Dashboard::new(Arc::new(copt.to_client().await));
                match dashboard.refresh_programs().await {
                    Ok(programs) => {
                        if programs.is_empty() {
                            eprintln!("No programs found.");
                        }
                        for program in programs {
                            copt.output_mode.print_message(program);
                        }
                        ExitCode::SUCCESS
                    }
                    Err(e) => report_error(dashboard.client(), e).await,
                }
            }
            ProgramOpt::Get { copt, id } => {
                let client = copt.to_client().await;
                match client.program_get(*id).await {
                    Ok(program) => {
                        copt.output_mode.print_message(program);
                        ExitCode::SUCCESS
                    }
                    Err(e) => report_error(&client, e).await,
                }
            }
            ProgramOpt::Create { copt, name } => {
                let mut dashboard = Dashboard::new(Arc::new(copt.to_client().await));
                match dashboard.create_program(name).await {
                    Ok(program) => {
                        copt.output_mode.print_message(program);
                        ExitCode::SUCCESS
                    }
                    Err(e) => report_error(dashboard.client(), e).await,
                }
            }
        }
    }
}
