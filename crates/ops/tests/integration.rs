//! Integration tests for ops crate

#[cfg(test)]
mod tests {
    use conpack_config::Config;
    use conpack_errors::{Error, StorageError};
    use conpack_events::ConsolidationEvent;
    use conpack_index::ConsolidatedPackageIndex;
    use conpack_ops::naming::is_consolidated_archive_name;
    use conpack_ops::*;
    use conpack_types::PackageSource;
    use std::fs::File;
    use std::io::{Cursor, Read, Write};
    use std::path::{Path, PathBuf};
    use tempfile::{tempdir, TempDir};
    use zip::write::SimpleFileOptions;
    use zip::{ZipArchive, ZipWriter};

    fn zip_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, data) in entries {
            if name.ends_with('/') {
                writer.add_directory(*name, SimpleFileOptions::default()).unwrap();
                continue;
            }
            writer.start_file(*name, SimpleFileOptions::default()).unwrap();
            writer.write_all(data).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    struct Fixture {
        _inputs: TempDir,
        _scratch: TempDir,
        output: TempDir,
        simple: PathBuf,
        container: PathBuf,
        config: Config,
    }

    impl Fixture {
        fn new() -> Self {
            let inputs = tempdir().unwrap();
            let scratch = tempdir().unwrap();
            let output = tempdir().unwrap();

            let simple = inputs.path().join("Tool.Cloud.4.2.1.nupkg");
            let nuspec = b"<package><metadata><id>Tool.Cloud</id><version>4.2.1</version></metadata></package>";
            std::fs::write(
                &simple,
                zip_bytes(&[
                    ("Tool.Cloud.nuspec", nuspec.as_slice()),
                    ("lib/Tool.Cloud.dll", b"shared"),
                ]),
            )
            .unwrap();

            let nested = zip_bytes(&[
                ("win-x64/lib/Tool.Cloud.dll", b"shared"),
                ("linux-x64/tool", b"elf"),
            ]);
            let container = inputs.path().join("Tool.Plugins.1.0.0.zip");
            std::fs::write(
                &container,
                zip_bytes(&[("tools/Tool.Aws.zip", nested.as_slice())]),
            )
            .unwrap();

            let mut config = Config::default();
            config.paths.scratch_dir = Some(scratch.path().to_path_buf());

            Self {
                _inputs: inputs,
                _scratch: scratch,
                output,
                simple,
                container,
                config,
            }
        }

        fn sources(&self) -> Vec<PackageSource> {
            vec![
                PackageSource::new("Tool.Cloud", "4.2.1", true, &self.simple),
                PackageSource::new("Tool.Plugins", "1.0.0", false, &self.container),
            ]
        }

        fn lenient(&self) -> Config {
            let mut config = self.config.clone();
            config.consolidation.fail_fast = false;
            config
        }

        fn break_container(&self) {
            std::fs::write(
                &self.container,
                zip_bytes(&[("tools/Tool.Aws.zip", b"not a zip")]),
            )
            .unwrap();
        }

        fn output(&self) -> &Path {
            self.output.path()
        }

        fn archives(&self) -> Vec<String> {
            let mut names: Vec<String> = std::fs::read_dir(self.output())
                .unwrap()
                .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
                .filter(|n| n != ".conpack.lock")
                .collect();
            names.sort();
            names
        }
    }

    fn read_index(path: &Path) -> ConsolidatedPackageIndex {
        let mut archive = ZipArchive::new(File::open(path).unwrap()).unwrap();
        let mut json = String::new();
        archive
            .by_name("index.json")
            .unwrap()
            .read_to_string(&mut json)
            .unwrap();
        ConsolidatedPackageIndex::from_json(&json).unwrap()
    }

    #[test]
    fn test_full_run_publishes_archive() {
        let fx = Fixture::new();
        let report = Consolidate::new(fx.config.clone())
            .execute(fx.output(), &fx.sources())
            .unwrap();

        assert!(!report.cache_hit);
        assert!(report.destination.is_file());
        let name = report.destination.file_name().unwrap().to_str().unwrap();
        assert!(is_consolidated_archive_name(name));
        assert_eq!(name, format!("{}.zip", report.combination_hash));

        // Only the published archive is left behind
        assert_eq!(fx.archives(), vec![name.to_string()]);

        let summary = report.summary.unwrap();
        assert_eq!(summary.descriptors, 3);
        // lib/Tool.Cloud.dll is byte-identical in both packages
        assert_eq!(summary.blobs_written, 2);
        assert_eq!(summary.packages, 2);

        let index = read_index(&report.destination);
        assert!(index.package("Tool.Cloud").unwrap().is_single_payload);
        assert_eq!(index.platforms("Tool.Aws").collect::<Vec<_>>(), vec!["linux-x64", "win-x64"]);
        assert_eq!(index.package("Tool.Aws").unwrap().version, "1.0.0");
        assert_eq!(
            index.hashes_for("Tool.Cloud", "any"),
            index.hashes_for("Tool.Aws", "win-x64")
        );
    }

    #[test]
    fn test_second_run_is_cache_hit() {
        let fx = Fixture::new();
        let consolidate = Consolidate::new(fx.config.clone());
        let first = consolidate.execute(fx.output(), &fx.sources()).unwrap();

        let mut reordered = fx.sources();
        reordered.reverse();
        let second = consolidate.execute(fx.output(), &reordered).unwrap();

        assert!(second.cache_hit);
        assert!(second.summary.is_none());
        assert_eq!(first.destination, second.destination);
    }

    #[test]
    fn test_changed_input_prunes_old_archive() {
        let fx = Fixture::new();
        let consolidate = Consolidate::new(fx.config.clone());
        let first = consolidate.execute(fx.output(), &fx.sources()).unwrap();

        let sources = vec![PackageSource::new("Tool.Cloud", "4.2.1", true, &fx.simple)];
        let second = consolidate.execute(fx.output(), &sources).unwrap();

        assert_ne!(first.destination, second.destination);
        assert_eq!(second.removed, vec![first.destination.clone()]);
        assert!(!first.destination.exists());
        assert_eq!(fx.archives().len(), 1);
    }

    #[test]
    fn test_prune_disabled_keeps_old_archive() {
        let fx = Fixture::new();
        let mut config = fx.config.clone();
        config.consolidation.prune_stale = false;
        let consolidate = Consolidate::new(config);

        let first = consolidate.execute(fx.output(), &fx.sources()).unwrap();
        let sources = vec![PackageSource::new("Tool.Cloud", "4.2.1", true, &fx.simple)];
        let second = consolidate.execute(fx.output(), &sources).unwrap();

        assert!(second.removed.is_empty());
        assert!(first.destination.exists());
        assert_eq!(fx.archives().len(), 2);
    }

    #[test]
    fn test_missing_output_dir() {
        let fx = Fixture::new();
        let missing = fx.output().join("nope");
        let result = Consolidate::new(fx.config.clone()).execute(&missing, &fx.sources());
        assert!(matches!(
            result,
            Err(Error::Storage(StorageError::DirectoryNotFound { .. }))
        ));
    }

    #[test]
    fn test_broken_package_aborts_by_default() {
        let fx = Fixture::new();
        std::fs::write(
            &fx.container,
            zip_bytes(&[("tools/Tool.Aws.zip", b"not a zip")]),
        )
        .unwrap();

        let result = Consolidate::new(fx.config.clone()).execute(fx.output(), &fx.sources());
        assert!(result.is_err());
        assert!(fx.archives().is_empty());
    }

    #[test]
    fn test_broken_package_skipped_when_lenient() {
        let fx = Fixture::new();
        std::fs::write(
            &fx.container,
            zip_bytes(&[("tools/Tool.Aws.zip", b"not a zip")]),
        )
        .unwrap();
        let mut config = fx.config.clone();
        config.consolidation.fail_fast = false;

        let (tx, mut rx) = conpack_events::channel();
        let report = Consolidate::new(config)
            .with_event_sender(tx)
            .execute(fx.output(), &fx.sources())
            .unwrap();

        assert_eq!(report.skipped, vec!["Tool.Plugins".to_string()]);
        let index = read_index(&report.destination);
        assert!(index.package("Tool.Cloud").is_some());
        assert!(index.package("Tool.Aws").is_none());

        let mut skipped_events = 0;
        while let Ok(event) = rx.try_recv() {
            if matches!(event, ConsolidationEvent::PackageSkipped { .. }) {
                skipped_events += 1;
            }
        }
        assert_eq!(skipped_events, 1);
    }

    #[test]
    fn test_identity_errors_abort_even_when_lenient() {
        let fx = Fixture::new();
        std::fs::write(&fx.simple, zip_bytes(&[("lib/Tool.Cloud.dll", b"x")])).unwrap();
        let mut config = fx.config.clone();
        config.consolidation.fail_fast = false;

        let err = Consolidate::new(config)
            .execute(fx.output(), &fx.sources())
            .unwrap_err();
        assert!(err.is_identity_error());
        assert!(fx.archives().is_empty());
    }

    #[test]
    fn test_report_json() {
        let fx = Fixture::new();
        let report = Consolidate::new(fx.config.clone())
            .execute(fx.output(), &fx.sources())
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(value["cache_hit"], false);
        assert_eq!(value["summary"]["blobs_written"], 2);
    }

    #[test]
    fn test_missing_package_skipped_when_lenient() {
        let fx = Fixture::new();
        let mut sources = fx.sources();
        sources[1] = PackageSource::new(
            "Gone",
            "1.0.0",
            false,
            fx.simple.with_file_name("gone.zip"),
        );

        let (tx, mut rx) = conpack_events::channel();
        let report = Consolidate::new(fx.lenient())
            .with_event_sender(tx)
            .execute(fx.output(), &sources)
            .unwrap();

        assert!(!report.cache_hit);
        assert_eq!(report.skipped, vec!["Gone".to_string()]);
        let index = read_index(&report.destination);
        assert!(index.package("Tool.Cloud").is_some());
        assert_eq!(report.summary.unwrap().packages, 1);

        let mut skipped = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let ConsolidationEvent::PackageSkipped { package_id, .. } = event {
                skipped.push(package_id);
            }
        }
        assert_eq!(skipped, vec!["Gone".to_string()]);
    }

    #[test]
    fn test_missing_package_aborts_by_default() {
        let fx = Fixture::new();
        let sources = vec![
            PackageSource::new("Tool.Cloud", "4.2.1", true, &fx.simple),
            PackageSource::new("Gone", "1.0.0", false, fx.simple.with_file_name("gone.zip")),
        ];

        let result = Consolidate::new(fx.config.clone()).execute(fx.output(), &sources);
        assert!(matches!(
            result,
            Err(Error::Storage(StorageError::PathNotFound { .. }))
        ));
        assert!(fx.archives().is_empty());
    }

    #[test]
    fn test_partial_archive_not_reused_by_strict_run() {
        let fx = Fixture::new();
        fx.break_container();

        let partial = Consolidate::new(fx.lenient())
            .execute(fx.output(), &fx.sources())
            .unwrap();
        assert!(!partial.cache_hit);
        assert_eq!(partial.skipped, vec!["Tool.Plugins".to_string()]);

        // Same inputs, every package required: must not accept the partial archive
        let strict = Consolidate::new(fx.config.clone()).execute(fx.output(), &fx.sources());
        assert!(strict.is_err());
        assert_eq!(
            fx.archives(),
            vec![partial
                .destination
                .file_name()
                .unwrap()
                .to_string_lossy()
                .into_owned()]
        );

        // Another lenient run lands on the same partial archive
        let again = Consolidate::new(fx.lenient())
            .execute(fx.output(), &fx.sources())
            .unwrap();
        assert!(again.cache_hit);
        assert_eq!(again.destination, partial.destination);
        assert_eq!(again.skipped, vec!["Tool.Plugins".to_string()]);
    }

    #[test]
    fn test_partial_and_complete_archives_named_apart() {
        let fx = Fixture::new();
        let complete = Consolidate::new(fx.config.clone())
            .execute(fx.output(), &fx.sources())
            .unwrap();

        fx.break_container();
        let partial = Consolidate::new(fx.lenient())
            .execute(fx.output(), &fx.sources())
            .unwrap();

        assert!(!partial.cache_hit);
        assert_ne!(partial.destination, complete.destination);

        // Only Tool.Cloud contributes, but the archive is not the one a
        // run over Tool.Cloud alone would produce
        let alone = vec![PackageSource::new("Tool.Cloud", "4.2.1", true, &fx.simple)];
        let cloud_only = Consolidate::new(fx.config.clone())
            .execute(fx.output(), &alone)
            .unwrap();
        assert!(!cloud_only.cache_hit);
        assert_ne!(cloud_only.destination, partial.destination);
    }

    #[test]
    fn test_empty_tools_folder_next_to_real_package() {
        let fx = Fixture::new();
        std::fs::write(&fx.container, zip_bytes(&[("tools/", b"")])).unwrap();

        let (tx, mut rx) = conpack_events::channel();
        let report = Consolidate::new(fx.config.clone())
            .with_event_sender(tx)
            .execute(fx.output(), &fx.sources())
            .unwrap();

        assert!(report.skipped.is_empty());
        let summary = report.summary.unwrap();
        assert_eq!(summary.descriptors, 1);
        assert_eq!(summary.blobs_written, 1);
        assert_eq!(summary.packages, 1);

        let index = read_index(&report.destination);
        assert!(index.package("Tool.Plugins").is_none());
        assert_eq!(index.distinct_hashes(), 1);
        let hashes = index.hashes_for("Tool.Cloud", "any").unwrap();
        assert_eq!(hashes.len(), 1);

        let archive = ZipArchive::new(File::open(&report.destination).unwrap()).unwrap();
        let mut names: Vec<String> = archive.file_names().map(str::to_string).collect();
        names.sort_unstable();
        assert_eq!(
            names,
            vec![
                format!("{}/lib/Tool.Cloud.dll", hashes[0]),
                "index.json".to_string()
            ]
        );

        let mut empty_events = 0;
        while let Ok(event) = rx.try_recv() {
            if matches!(event, ConsolidationEvent::ToolsFolderEmpty { .. }) {
                empty_events += 1;
            }
        }
        assert_eq!(empty_events, 1);
    }

    #[test]
    fn test_container_without_tools_folder_next_to_real_package() {
        let fx = Fixture::new();
        std::fs::write(
            &fx.container,
            zip_bytes(&[("content/readme.txt", b"no tools here")]),
        )
        .unwrap();

        let (tx, mut rx) = conpack_events::channel();
        let report = Consolidate::new(fx.config.clone())
            .with_event_sender(tx)
            .execute(fx.output(), &fx.sources())
            .unwrap();

        assert!(report.skipped.is_empty());
        assert_eq!(report.summary.unwrap().blobs_written, 1);
        let index = read_index(&report.destination);
        assert!(index.package("Tool.Cloud").is_some());
        assert!(index.package("Tool.Plugins").is_none());
        assert_eq!(index.distinct_hashes(), 1);

        let mut missing = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let ConsolidationEvent::ToolsFolderMissing { package_id, folder } = event {
                missing.push((package_id, folder));
            }
        }
        assert_eq!(
            missing,
            vec![("Tool.Plugins".to_string(), "tools".to_string())]
        );
    }
}
