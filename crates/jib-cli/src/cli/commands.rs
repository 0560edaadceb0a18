use clap::{Args, Subcommand};

/// Available jib subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build the client and server bundles for production
    ///
    /// Cleans the output directory, copies static assets, bundles both
    /// targets, writes the asset manifests, and optionally generates a
    /// service worker (GENERATE_SW) and a container image (--docker).
    Build(BuildArgs),

    /// Start the development server
    ///
    /// Watches source files, rebuilds both bundles on change, serves the
    /// browser bundle with live reload, and proxies everything else into the
    /// freshly built server bundle with hot module replacement.
    Start(StartArgs),

    /// Run the test suite through jest
    ///
    /// Assembles the jest configuration (coverage thresholds, extension
    /// resolution, ignore patterns) and forwards the remaining arguments.
    /// Defaults to --watchAll unless --coverage or --watchAll is given.
    Test(TestArgs),

    /// Run the production server from the build output
    ///
    /// Spawns `node build/server.js` with clustering enabled, forwarding the
    /// trailing arguments and the child's exit status.
    Serve(ServeArgs),
}

/// Arguments for the build command
#[derive(Args, Debug, Default)]
pub struct BuildArgs {
    /// Build a container image after bundling
    ///
    /// Runs `docker build -t <name> .` in the project root, where <name> is
    /// the package name (override with dockerImage in jib.config.json).
    #[arg(long)]
    pub docker: bool,
}

/// Arguments for the start command (development server)
#[derive(Args, Debug, Default)]
pub struct StartArgs {
    /// Show the in-page status toast of the live-reload client
    #[arg(long)]
    pub ui: bool,

    /// Mirror scroll and navigation across connected browsers
    #[arg(long)]
    pub ghost: bool,

    /// Port for the development server (overrides jib.config.json)
    #[arg(short, long, value_name = "PORT")]
    pub port: Option<u16>,
}

/// Arguments for the test command (jest wrapper)
#[derive(Args, Debug, Default)]
pub struct TestArgs {
    /// Arguments forwarded to jest (e.g. --coverage, test name patterns)
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, value_name = "JEST_ARGS")]
    pub args: Vec<String>,
}

/// Arguments for the serve command (production server child)
#[derive(Args, Debug, Default)]
pub struct ServeArgs {
    /// Pass the Node inspector flag to the server process
    #[arg(long)]
    pub inspect: bool,

    /// Forwarded to the server process
    #[arg(long)]
    pub ui: bool,

    /// Forwarded to the server process
    #[arg(long)]
    pub ghost: bool,

    /// Remaining arguments forwarded verbatim to the server process
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, value_name = "ARGS")]
    pub args: Vec<String>,
}
