/// Drives one session through its whole lifecycle against the configured
/// session store backend.
///
/// $ cargo run --bin session_demo -- --settings=settings/dev.toml
use sessionkeeper::application_port::*;
use sessionkeeper::domain_model::UserId;
use sessionkeeper::logger::*;
use sessionkeeper::server::Server;
use sessionkeeper::settings::*;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let logger = Logger::install();
    let project_settings = parse_settings(cli.settings.as_deref())?;
    logger.apply(&project_settings.log)?;

    let server = Server::try_new(&project_settings).await?;
    let tokens = server.token_service.clone();
    let user_id = UserId(7);

    let pair = tokens.issue_new_pair(user_id).await?;
    println!("issued session {} for user {}", pair.session_id, user_id);
    println!("  access expires at  {}", pair.access_expires_at);
    println!("  refresh expires at {}", pair.refresh_expires_at);

    let verified = tokens.verify_access(&pair.access_token.0).await?;
    println!("verify -> user {} session {}", verified.user_id, verified.session_id);

    let rotated = tokens.refresh(&pair.refresh_token.0).await?;
    println!("refresh -> new session {}", rotated.session_id);

    match tokens.refresh(&pair.refresh_token.0).await {
        Err(AuthError::UserUnauthorized) => println!("replayed refresh token -> unauthorized"),
        other => println!("replayed refresh token -> unexpected {:?}", other.map(|p| p.session_id)),
    }

    tokens.logout(user_id, &rotated.session_id).await?;
    match tokens.verify_access(&rotated.access_token.0).await {
        Err(AuthError::UserUnauthorized) => println!("after logout -> unauthorized"),
        other => println!("after logout -> unexpected {:?}", other),
    }

    let mut live = Vec::new();
    loop {
        match tokens.issue_new_pair(user_id).await {
            Ok(pair) => live.push(pair.session_id),
            Err(AuthError::MaxLoggedIn) => {
                println!("session limit reached after {} logins", live.len());
                break;
            }
            Err(e) => return Err(e.into()),
        }
    }
    for session_id in &live {
        tokens.logout(user_id, session_id).await?;
    }

    Ok(())
}
