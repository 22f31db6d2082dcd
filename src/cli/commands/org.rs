use clap::Subcommand;
use uuid::Uuid;

use crate::cli::config::{load_session, save_session};
use crate::cli::utils::{output_data, output_success};
use crate::cli::OutputFormat;
use crate::database::models::MemberRole;
use crate::services::{AcceptInvitationRequest, InviteRequest, UpdateRoleRequest};

fn parse_role(raw: &str) -> Result<MemberRole, String> {
    match raw.to_ascii_lowercase().as_str() {
        "owner" => Ok(MemberRole::Owner),
        "admin" => Ok(MemberRole::Admin),
        "member" => Ok(MemberRole::Member),
        other => Err(format!("unknown role '{}' (owner, admin, member)", other)),
    }
}

#[derive(Subcommand)]
pub enum OrgCommands {
    #[command(about = "Show the active organization")]
    Current,

    #[command(about = "Select the organization sent with every request")]
    Use {
        #[arg(help = "Organization id")]
        organization_id: Uuid,
    },

    #[command(about = "List members of the active organization")]
    Members,

    #[command(about = "Invite a registered user")]
    Invite {
        #[arg(help = "Email of the user to invite")]
        email: String,
        #[arg(long, default_value = "member", value_parser = parse_role)]
        role: MemberRole,
    },

    #[command(about = "Accept an invitation token")]
    Accept {
        #[arg(help = "Invitation token")]
        token: String,
    },

    #[command(about = "Change a member's role")]
    Role {
        #[arg(help = "Membership id")]
        member_id: Uuid,
        #[arg(value_parser = parse_role)]
        role: MemberRole,
    },

    #[command(about = "Remove a member")]
    Remove {
        #[arg(help = "Membership id")]
        member_id: Uuid,
    },

    #[command(about = "Seed sample catalog, pricing and a demo job")]
    Seed,
}

pub async fn handle(cmd: OrgCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let mut session = load_session()?;
    let client = session.authenticated_client()?;

    match cmd {
        OrgCommands::Current => {
            let current = client.current_organization().await?;
            output_data(&output_format, &format!("Organization {}", current.organization.name), &current)
        }
        OrgCommands::Use { organization_id } => {
            session.organization_id = Some(organization_id);
            let current = session.client()?.current_organization().await?;
            save_session(&session)?;
            output_success(&output_format, &format!("Using organization {}", current.organization.name))
        }
        OrgCommands::Members => {
            let org_id = client.current_organization().await?.organization.id;
            let members = client.members(org_id).await?;
            output_data(&output_format, &format!("{} members", members.len()), &members)
        }
        OrgCommands::Invite { email, role } => {
            let org_id = client.current_organization().await?.organization.id;
            let invitation = client.invite(org_id, &InviteRequest { email, role }).await?;
            output_data(&output_format, "Invitation created; share the token with the invitee", &invitation)
        }
        OrgCommands::Accept { token } => {
            let member = client.accept_invitation(&AcceptInvitationRequest { token }).await?;
            output_data(&output_format, "Invitation accepted", &member)
        }
        OrgCommands::Role { member_id, role } => {
            let org_id = client.current_organization().await?.organization.id;
            let member = client.update_role(org_id, member_id, &UpdateRoleRequest { role }).await?;
            output_data(&output_format, "Role updated", &member)
        }
        OrgCommands::Remove { member_id } => {
            let org_id = client.current_organization().await?.organization.id;
            client.remove_member(org_id, member_id).await?;
            output_success(&output_format, &format!("Removed member {}", member_id))
        }
        OrgCommands::Seed => {
            let org_id = client.current_organization().await?.organization.id;
            let summary = client.seed_sample_data(org_id).await?;
            output_data(&output_format, "Sample data created", &summary)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_parse_case_insensitively() {
        assert_eq!(parse_role("Admin"), Ok(MemberRole::Admin));
        assert!(parse_role("boss").is_err());
    }
}
