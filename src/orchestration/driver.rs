use super::pages::{Page, Pages};
use crate::compile::{CompileJobBuilder, CompileQueue, QueueClosed, QueueTask};
use crate::config::Config;
use crate::datasource::{DataSourceError, MembershipSource};
use crate::domain::{ContactId, ContactRecord, MemberId, MembershipRecord};
use crate::engine::{
    needs_invoice, prefers_snail_mail, project_hash, LocaleResolver, StatusSelection, UrlSigner,
};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Drives one invoice run: pages through memberships, picks the members that
/// get a letter and hands their compile tasks to the queue.
#[derive(Debug, Clone)]
pub struct InvoiceRun {
    source: Arc<dyn MembershipSource>,
    locales: LocaleResolver,
    jobs: CompileJobBuilder,
    compile_url: String,
    session_secret: String,
    output_dir: PathBuf,
    page_size: usize,
}

/// Counters for one run, logged at the end.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    pub pages: usize,
    pub memberships: usize,
    pub eligible: usize,
    pub queued: usize,
}

#[derive(Debug, Error)]
pub enum RunError {
    #[error("membership query at offset {offset} failed: {source}")]
    MembershipQuery {
        offset: usize,
        source: DataSourceError,
    },
    #[error("contact query for {contact_id} failed: {source}")]
    ContactQuery {
        contact_id: ContactId,
        source: DataSourceError,
    },
    #[error(transparent)]
    Queue(#[from] QueueClosed),
}

impl InvoiceRun {
    pub fn new(source: Arc<dyn MembershipSource>, config: &Config) -> Self {
        let signer = UrlSigner::new(config.invoice_secret.clone());
        let jobs = CompileJobBuilder::new(
            signer,
            config.template_api_url.clone(),
            config.static_asset_url.clone(),
        )
        .with_options(config.compile_options.clone());

        Self {
            source,
            locales: LocaleResolver::default(),
            jobs,
            compile_url: config.compile_url.trim_end_matches('/').to_string(),
            session_secret: config.session_secret.clone(),
            output_dir: config.output_dir.clone(),
            page_size: config.page_size,
        }
    }

    pub fn with_locales(mut self, locales: LocaleResolver) -> Self {
        self.locales = locales;
        self
    }

    /// Compile project of a member on the compile service.
    pub fn project_base(&self, member_id: &MemberId) -> String {
        format!(
            "{}/project/{}",
            self.compile_url,
            project_hash(&self.session_secret, member_id.as_str())
        )
    }

    /// Build the queue task for a member who gets a letter.
    pub fn task_for(&self, member_id: &MemberId, contact: &ContactRecord) -> QueueTask {
        let locale = self
            .locales
            .letter_locale(contact.preferred_language.as_deref());
        debug!(
            "Letter for {}: template={} subject={:?} from={:?}",
            member_id, locale.template, locale.subject, locale.sender
        );

        QueueTask {
            member_id: member_id.clone(),
            project_base: self.project_base(member_id),
            compile_job: self.jobs.build(member_id, &locale.template),
            output_dir: self.output_dir.clone(),
            output_file_name: member_id.output_file_name(),
        }
    }

    /// Page through every membership and queue a task per member who gets a
    /// letter. Returns once every page has been read and its tasks pushed;
    /// the tasks themselves finish on the queue.
    pub async fn run(
        &self,
        selection: &StatusSelection,
        queue: &CompileQueue,
    ) -> Result<RunStats, RunError> {
        let mut stats = RunStats::default();
        let mut pages = Pages::new(self.source.as_ref(), self.page_size);

        loop {
            let offset = pages.cursor().offset;
            let page = match pages.next_page().await {
                Ok(Some(page)) => page,
                Ok(None) => break,
                Err(source) => return Err(RunError::MembershipQuery { offset, source }),
            };

            info!("result get_membership: {}", page.records.len());
            stats.pages += 1;
            stats.memberships += page.records.len();
            self.process_page(&page, selection, queue, &mut stats).await?;
        }

        debug!(
            "Pagination finished: {} pages, {} memberships, {} eligible, {} queued",
            stats.pages, stats.memberships, stats.eligible, stats.queued
        );
        Ok(stats)
    }

    async fn process_page(
        &self,
        page: &Page,
        selection: &StatusSelection,
        queue: &CompileQueue,
        stats: &mut RunStats,
    ) -> Result<(), RunError> {
        let eligible: Vec<&MembershipRecord> = page
            .records
            .iter()
            .filter(|record| needs_invoice(&record.status_id, selection))
            .collect();
        stats.eligible += eligible.len();

        let lookups = eligible.iter().map(|record| async move {
            self.source
                .fetch_contact(&record.contact_id)
                .await
                .map(|contact| (*record, contact))
                .map_err(|source| RunError::ContactQuery {
                    contact_id: record.contact_id.clone(),
                    source,
                })
        });
        let contacts = futures::future::try_join_all(lookups).await?;

        for (record, contact) in contacts {
            let Some(contact) = contact else {
                warn!("No contact {} for eligible membership", record.contact_id);
                continue;
            };
            if !prefers_snail_mail(&contact.preferred_communication_method) {
                continue;
            }
            let Some(member_id) = MemberId::parse(&contact.external_identifier) else {
                warn!(
                    "Contact {} has no usable external identifier ({:?})",
                    record.contact_id, contact.external_identifier
                );
                continue;
            };

            info!("{} {} {}", member_id, contact.first_name, contact.last_name);
            queue.push(self.task_for(&member_id, &contact))?;
            stats.queued += 1;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile::CompileOptions;
    use crate::datasource::MockMembershipSource;

    fn test_config(output_dir: PathBuf) -> Config {
        Config {
            civicrm_server: "http://crm.invalid".to_string(),
            civicrm_path: "/rest.php".to_string(),
            civicrm_site_key: "site".to_string(),
            civicrm_api_key: "api".to_string(),
            membership_type: "PPS".to_string(),
            template_api_url: "https://api.example.invalid".to_string(),
            compile_url: "http://latex.invalid/".to_string(),
            static_asset_url: "http://127.0.0.1:81/static/inv".to_string(),
            invoice_secret: "invoice".to_string(),
            session_secret: "session".to_string(),
            output_dir,
            compile_options: CompileOptions::default(),
            queue_workers: 2,
            page_size: 100,
            download_timeout: None,
        }
    }

    #[test]
    fn test_project_base_uses_session_hash() {
        let run = InvoiceRun::new(
            Arc::new(MockMembershipSource::new()),
            &test_config(PathBuf::from("/tmp/out")),
        );
        let member = MemberId::parse("M007").unwrap();
        assert_eq!(
            run.project_base(&member),
            format!(
                "http://latex.invalid/project/{}",
                project_hash("session", "M007")
            )
        );
    }

    #[test]
    fn test_task_for_defaults_to_english() {
        let run = InvoiceRun::new(
            Arc::new(MockMembershipSource::new()),
            &test_config(PathBuf::from("/tmp/out")),
        );
        let member = MemberId::parse("M9").unwrap();
        let contact = ContactRecord {
            external_identifier: "M9".to_string(),
            preferred_communication_method: vec!["3".to_string()],
            preferred_language: Some("xx_YY".to_string()),
            ..Default::default()
        };
        let task = run.task_for(&member, &contact);

        assert_eq!(task.output_file_name, "M9.pdf");
        assert_eq!(task.output_dir, PathBuf::from("/tmp/out"));
        let root = task.compile_job.root_resource().unwrap();
        assert!(root.url.ends_with("/M9/texinvoiceletteren"));
    }
}
