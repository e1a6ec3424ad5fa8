//! Compile job construction.

use super::{CompileJob, CompileOptions, Resource};
use crate::domain::MemberId;
use crate::engine::UrlSigner;

/// Root document name inside the compile project.
pub const ROOT_RESOURCE: &str = "main.tex";

/// Signed namespace of the template service.
pub const TEMPLATE_NAMESPACE: &str = "letterman";

/// Static style and image files every invoice letter needs, in the order the
/// compiler receives them.
pub const DEFAULT_STATIC_ASSETS: [&str; 5] = [
    "esr.sty",
    "esrpos.sty",
    "orange-pay.png",
    "sig-st.png",
    "sig-gs.png",
];

/// A static resource served from the asset base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticAsset {
    pub path: String,
    pub file: String,
}

impl StaticAsset {
    pub fn same_name(name: &str) -> Self {
        Self {
            path: name.to_string(),
            file: name.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CompileJobBuilder {
    signer: UrlSigner,
    secure_base_url: String,
    static_base_url: String,
    assets: Vec<StaticAsset>,
    options: CompileOptions,
}

impl CompileJobBuilder {
    pub fn new(
        signer: UrlSigner,
        secure_base_url: impl Into<String>,
        static_base_url: impl Into<String>,
    ) -> Self {
        Self {
            signer,
            secure_base_url: secure_base_url.into(),
            static_base_url: static_base_url.into(),
            assets: DEFAULT_STATIC_ASSETS
                .iter()
                .map(|name| StaticAsset::same_name(name))
                .collect(),
            options: CompileOptions::default(),
        }
    }

    pub fn with_options(mut self, options: CompileOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_assets(mut self, assets: Vec<StaticAsset>) -> Self {
        self.assets = assets;
        self
    }

    /// URL the compiler fetches the member's rendered template from.
    pub fn template_url(&self, member_id: &MemberId, template: &str) -> String {
        let signed = self.signer.sign(
            TEMPLATE_NAMESPACE,
            &format!("{}/{}", member_id.as_str(), template),
        );
        format!("{}/api/v1/{}", self.secure_base_url.trim_end_matches('/'), signed)
    }

    pub fn build(&self, member_id: &MemberId, template: &str) -> CompileJob {
        let static_base = self.static_base_url.trim_end_matches('/');
        let mut resources = Vec::with_capacity(self.assets.len() + 1);
        resources.push(Resource {
            path: ROOT_RESOURCE.to_string(),
            url: self.template_url(member_id, template),
        });
        resources.extend(self.assets.iter().map(|asset| Resource {
            path: asset.path.clone(),
            url: format!("{}/{}", static_base, asset.file),
        }));

        CompileJob {
            options: self.options.clone(),
            root_resource_path: ROOT_RESOURCE.to_string(),
            resources,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::sign;

    fn builder() -> CompileJobBuilder {
        CompileJobBuilder::new(
            UrlSigner::new("s3cret"),
            "https://api.example.org/",
            "http://127.0.0.1:81/static/inv",
        )
    }

    #[test]
    fn test_build_root_resource_is_signed() {
        let member = MemberId::parse("42").unwrap();
        let job = builder().build(&member, "texinvoiceletterde");

        assert_eq!(job.root_resource_path, "main.tex");
        let root = job.root_resource().unwrap();
        assert_eq!(
            root.url,
            format!(
                "https://api.example.org/api/v1/{}",
                sign("s3cret", "letterman", "42/texinvoiceletterde")
            )
        );
    }

    #[test]
    fn test_build_static_resources_in_order() {
        let member = MemberId::parse("42").unwrap();
        let job = builder().build(&member, "texinvoiceletterde");

        let paths: Vec<&str> = job.resources.iter().map(|r| r.path.as_str()).collect();
        assert_eq!(
            paths,
            vec!["main.tex", "esr.sty", "esrpos.sty", "orange-pay.png", "sig-st.png", "sig-gs.png"]
        );
        assert_eq!(job.resources[1].url, "http://127.0.0.1:81/static/inv/esr.sty");
        assert_eq!(job.options, CompileOptions::default());
    }

    #[test]
    fn test_options_and_assets_override() {
        let member = MemberId::parse("42").unwrap();
        let job = builder()
            .with_options(CompileOptions {
                compiler: "lualatex".to_string(),
                timeout: 90,
            })
            .with_assets(vec![StaticAsset {
                path: "logo.png".to_string(),
                file: "logo-2016.png".to_string(),
            }])
            .build(&member, "texinvoiceletteren");

        assert_eq!(job.options.compiler, "lualatex");
        assert_eq!(job.options.timeout, 90);
        assert_eq!(job.resources.len(), 2);
        assert_eq!(job.resources[1].url, "http://127.0.0.1:81/static/inv/logo-2016.png");
    }
}
