use once_cell::sync::OnceCell;
use std::env;

/// Runtime configuration, loaded once from `.env` / environment variables.
///
/// Everything has a sensible default so the tool works out of the box; the
/// only value a grader really has to set is `GRADER_INITIALS`, which is
/// substituted into the feedback footer.
#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub log_file: String,
    pub log_to_stdout: bool,
    /// Grader initials substituted into the feedback footer template.
    pub initials: String,
    /// Placeholder written into fresh submission copy names in place of points.
    pub points_placeholder: String,
    /// Keyword identifying a submission folder in the downloaded tree.
    pub submission_keyword: String,
    /// Footer appended to every finalized comment; `{}` is replaced with the
    /// grader initials.
    pub feedback_footer: String,
    /// Filename prefix for feedback copies returned to the platform.
    pub feedback_prefix: String,
    /// Upload size limit for a single returned archive, in bytes.
    pub upload_limit_bytes: u64,
    /// Divider token for the editable feedback text format.
    pub text_divider: String,
    /// Magic delimiter wrapping payload segments in the comment HTML.
    pub html_magic: String,
    /// Group name handed to the grading container.
    pub docker_group_name: String,
}

static CONFIG: OnceCell<Config> = OnceCell::new();

impl Config {
    pub fn init() -> &'static Self {
        dotenvy::dotenv().ok();

        CONFIG.get_or_init(|| Config {
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            log_file: env::var("LOG_FILE").unwrap_or_else(|_| "logs/pex-tool.log".into()),
            log_to_stdout: env::var("LOG_TO_STDOUT").unwrap_or_else(|_| "true".into()) == "true",
            initials: env::var("GRADER_INITIALS").unwrap_or_else(|_| "???".into()),
            points_placeholder: env::var("POINTS_PLACEHOLDER").unwrap_or_else(|_| " --- ".into()),
            submission_keyword: env::var("SUBMISSION_KEYWORD")
                .unwrap_or_else(|_| "assignsubmission_file".into()),
            feedback_footer: env::var("FEEDBACK_FOOTER")
                .unwrap_or_else(|_| "<strong>- {}</strong>".into()),
            feedback_prefix: env::var("FEEDBACK_PREFIX").unwrap_or_else(|_| "Feedback".into()),
            upload_limit_bytes: env::var("UPLOAD_LIMIT_BYTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(24_999_500),
            text_divider: env::var("TEXT_DIVIDER").unwrap_or_else(|_| "%".into()),
            html_magic: env::var("HTML_MAGIC").unwrap_or_else(|_| "<!--%%%-->".into()),
            docker_group_name: env::var("DOCKER_GROUP_NAME")
                .unwrap_or_else(|_| "pex-tool".into()),
        })
    }

    pub fn get() -> &'static Self {
        CONFIG.get().expect("Config not initialized")
    }

    /// The feedback footer with the grader initials substituted in.
    pub fn footer_with_initials(&self) -> String {
        self.feedback_footer.replacen("{}", &self.initials, 1)
    }
}
