//! System-wide constants: naming prefixes, tag keys, and defaults.

/// Service name used in physical names and the `Service` tag.
pub const SERVICE_NAME: &str = "sanders-customer-platform";

/// Value of the root-level `Project` tag.
pub const PROJECT_NAME: &str = "sanders-customer-platform";

/// Value of the root-level `ManagedBy` tag.
pub const MANAGED_BY: &str = "sanders-infra";

/// Short prefix used for resource names and export names.
pub const SHORT_PREFIX: &str = "sanders";

/// Prefix of the stack name; the environment is appended.
pub const STACK_NAME_PREFIX: &str = "SandersCustomerPlatformStack";

/// Prefix of the stack description; the environment is appended.
pub const STACK_DESCRIPTION_PREFIX: &str = "Sanders Customer Platform Infrastructure";

/// Region used when none is configured.
pub const DEFAULT_REGION: &str = "eu-central-1";

/// Template format version written at the top of every manifest.
pub const TEMPLATE_FORMAT_VERSION: &str = "2010-09-09";

/// Tag key: project.
pub const TAG_PROJECT: &str = "Project";
/// Tag key: deployment environment.
pub const TAG_ENVIRONMENT: &str = "Environment";
/// Tag key: owning tool.
pub const TAG_MANAGED_BY: &str = "ManagedBy";
/// Tag key: owning service.
pub const TAG_SERVICE: &str = "Service";
/// Tag key: display name (EC2 resources).
pub const TAG_NAME: &str = "Name";

/// Tag keys owned by the platform; user-supplied tags may not set them.
pub const RESERVED_TAG_KEYS: [&str; 4] = [TAG_PROJECT, TAG_ENVIRONMENT, TAG_MANAGED_BY, TAG_SERVICE];

/// Environment variable selecting the deployment environment.
pub const ENV_ENVIRONMENT: &str = "SANDERS_ENVIRONMENT";
/// Environment variable carrying the target account id.
pub const ENV_ACCOUNT: &str = "SANDERS_ACCOUNT";
/// Environment variable carrying the target region.
pub const ENV_REGION: &str = "SANDERS_REGION";

/// Default directory the cloud assembly is written to.
pub const DEFAULT_OUTPUT_DIR: &str = "sanders.out";

/// File name of the assembly manifest inside the output directory.
pub const ASSEMBLY_MANIFEST_FILE: &str = "manifest.json";

/// Binary name for the CLI.
pub const BIN_NAME: &str = "sanders";
