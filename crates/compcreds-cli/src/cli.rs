use std::fmt;

use clap::{Args, Parser, Subcommand};
use compcreds::CompCredentials;

/// CLI surface definition.
#[derive(Parser, Debug)]
#[command(
    name = "compcreds",
    about = "Manage per-component network credentials in encrypted storage",
    version,
    propagate_version = true
)]
pub struct Cli {
    /// Root key path to read and write (overrides the config file).
    #[arg(long, global = true)]
    pub root_path: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    #[command(flatten)]
    Creds(CredCommand),
    /// Store, read back and enumerate a canary credential.
    Health,
    /// Print version and exit.
    Version,
    /// Manage CLI configuration.
    #[command(subcommand)]
    Config(ConfigCommand),
}

/// Commands that operate on the credential store.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum CredCommand {
    /// Show the credentials for one component.
    Get { xname: String },
    /// Show the credentials for several components; missing ones are reported.
    GetMany {
        #[arg(required = true)]
        xnames: Vec<String>,
    },
    /// Show every component's credentials under the root path.
    List,
    /// Store (replace) the credentials for a component.
    Store(StoreArgs),
}

#[derive(Args, Clone, PartialEq, Eq)]
pub struct StoreArgs {
    #[arg(long)]
    pub xname: String,
    #[arg(long)]
    pub url: String,
    #[arg(long)]
    pub username: String,
    #[arg(long)]
    pub password: String,
    #[arg(long, default_value = "")]
    pub snmp_auth_pass: String,
    #[arg(long, default_value = "")]
    pub snmp_priv_pass: String,
}

impl StoreArgs {
    pub fn into_credentials(self) -> CompCredentials {
        CompCredentials::new(self.xname, self.url, self.username, self.password)
            .with_snmp(self.snmp_auth_pass, self.snmp_priv_pass)
    }
}

impl fmt::Debug for StoreArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.clone().into_credentials(), f)
    }
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum ConfigCommand {
    /// Create a default config file if one does not exist.
    Init,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_get_subcommand() {
        let cli = Cli::try_parse_from(["compcreds", "get", "x0c0s1b0"]).expect("parse");
        assert_eq!(
            cli.command,
            Command::Creds(CredCommand::Get {
                xname: "x0c0s1b0".into()
            })
        );
        assert_eq!(cli.root_path, None);
    }

    #[test]
    fn parses_global_root_path_after_subcommand() {
        let cli = Cli::try_parse_from(["compcreds", "list", "--root-path", "secret/hms-cred"])
            .expect("parse");
        assert_eq!(cli.command, Command::Creds(CredCommand::List));
        assert_eq!(cli.root_path.as_deref(), Some("secret/hms-cred"));
    }

    #[test]
    fn get_many_requires_an_xname() {
        assert!(Cli::try_parse_from(["compcreds", "get-many"]).is_err());
        let cli = Cli::try_parse_from(["compcreds", "get-many", "x0c0s1b0", "x0c0s2b0"])
            .expect("parse");
        assert_eq!(
            cli.command,
            Command::Creds(CredCommand::GetMany {
                xnames: vec!["x0c0s1b0".into(), "x0c0s2b0".into()]
            })
        );
    }

    #[test]
    fn parses_store_with_optional_snmp_passes() {
        let cli = Cli::try_parse_from([
            "compcreds",
            "store",
            "--xname",
            "x0c0s1b0",
            "--url",
            "10.4.0.21/redfish/v1/UpdateService",
            "--username",
            "test1",
            "--password",
            "123",
            "--snmp-auth-pass",
            "auth",
        ])
        .expect("parse");
        let Command::Creds(CredCommand::Store(args)) = cli.command else {
            panic!("expected store command");
        };
        let cred = args.into_credentials();
        assert_eq!(cred.xname, "x0c0s1b0");
        assert_eq!(cred.snmp_auth_pass, "auth");
        assert!(cred.snmp_priv_pass.is_empty());
    }

    #[test]
    fn debug_output_of_parsed_store_is_redacted() {
        let cli = Cli::try_parse_from([
            "compcreds", "store", "--xname", "x0", "--url", "u", "--username", "n",
            "--password", "s3cr3t",
        ])
        .expect("parse");
        assert!(!format!("{cli:?}").contains("s3cr3t"));
    }

    #[test]
    fn parses_config_init_subcommand() {
        let cli = Cli::try_parse_from(["compcreds", "config", "init"]).expect("parse");
        assert_eq!(cli.command, Command::Config(ConfigCommand::Init));
    }
}
