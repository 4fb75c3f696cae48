use clap::Subcommand;
use hlscan_auth::{CredentialStore, KeyringStore, TokenKind};

#[derive(Subcommand)]
pub enum AuthAction {
    /// Store a token in the OS keychain
    Set {
        /// Token kind: github or highlight
        kind: TokenKind,
        /// Token value (will prompt if not provided)
        #[arg(long)]
        token: Option<String>,
    },
    /// Remove a stored token
    Clear {
        /// Token kind: github or highlight
        kind: TokenKind,
    },
}

pub fn run(action: AuthAction) -> anyhow::Result<()> {
    let store = KeyringStore::new();
    match action {
        AuthAction::Set { kind, token } => {
            let token = match token {
                Some(t) => t,
                None => {
                    eprint!("Enter {kind} token: ");
                    let mut input = String::new();
                    std::io::stdin().read_line(&mut input)?;
                    input.trim().to_string()
                }
            };
            if token.is_empty() {
                anyhow::bail!("Token cannot be empty");
            }
            store.store(kind.credential_key(), &token)?;
            println!(
                "{kind} token stored in OS keychain; used when {} is empty",
                kind.property_key()
            );
            Ok(())
        }
        AuthAction::Clear { kind } => {
            store.delete(kind.credential_key())?;
            println!("{kind} token removed");
            Ok(())
        }
    }
}
