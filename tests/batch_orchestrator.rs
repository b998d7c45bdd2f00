use std::{
    cell::RefCell,
    path::{Path, PathBuf},
};

use filigree::{
    FiligreeError, FiligreeResult, Graph, ScalePolicy, TileConfig, WatermarkAsset,
    batch::{OUTPUT_PREFIX, eligible_files, run_batch},
    exec_ffmpeg::Executor,
    probe::DimensionProbe,
};

struct FakeProbe {
    fail_on: Option<&'static str>,
}

impl DimensionProbe for FakeProbe {
    fn probe(&self, path: &Path) -> FiligreeResult<(u32, u32)> {
        if let Some(marker) = self.fail_on
            && path.to_string_lossy().contains(marker)
        {
            return Err(FiligreeError::probe(format!(
                "dimensions unreadable for '{}'",
                path.display()
            )));
        }
        Ok((800, 600))
    }
}

#[derive(Default)]
struct RecordingExecutor {
    calls: RefCell<Vec<(PathBuf, PathBuf)>>,
}

impl Executor for RecordingExecutor {
    fn execute(
        &self,
        graph: &Graph,
        main: &Path,
        _watermark: &Path,
        out: &Path,
    ) -> FiligreeResult<()> {
        graph.validate()?;
        self.calls
            .borrow_mut()
            .push((main.to_path_buf(), out.to_path_buf()));
        Ok(())
    }
}

fn test_dir(name: &str) -> PathBuf {
    let dir = PathBuf::from("target").join("batch_tests").join(name);
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn touch(dir: &Path, name: &str) {
    std::fs::write(dir.join(name), b"").unwrap();
}

fn wm() -> WatermarkAsset {
    WatermarkAsset {
        width: 100,
        height: 50,
        opacity: 0.5,
    }
}

fn spread(density: u32) -> TileConfig {
    TileConfig::Spread { density }
}

#[test]
fn probe_failure_is_skipped_and_later_files_still_processed() {
    let dir = test_dir("five_files");
    for i in 1..=5 {
        touch(&dir, &format!("img{i}.png"));
    }
    let out_dir = dir.join("out");

    let probe = FakeProbe {
        fail_on: Some("img3"),
    };
    let executor = RecordingExecutor::default();

    let summary = run_batch(
        &dir,
        &out_dir,
        wm(),
        Path::new("wm.png"),
        &ScalePolicy::PercentOfCanvasWidth { percent: 10.0 },
        &spread(2),
        &probe,
        &executor,
    )
    .unwrap();

    assert_eq!(summary.succeeded, 4);
    assert_eq!(summary.total, 5);
    assert!(!summary.fully_successful());

    let calls = executor.calls.borrow();
    let mains: Vec<_> = calls
        .iter()
        .map(|(main, _)| main.file_name().unwrap().to_str().unwrap().to_string())
        .collect();
    assert_eq!(
        mains,
        vec!["img1.png", "img2.png", "img4.png", "img5.png"]
    );
}

#[test]
fn output_paths_are_prefixed_into_the_output_dir() {
    let dir = test_dir("prefixed");
    touch(&dir, "photo.jpg");
    let out_dir = dir.join("out");

    let probe = FakeProbe { fail_on: None };
    let executor = RecordingExecutor::default();

    let summary = run_batch(
        &dir,
        &out_dir,
        wm(),
        Path::new("wm.png"),
        &ScalePolicy::PercentOfCanvasWidth { percent: 10.0 },
        &TileConfig::None,
        &probe,
        &executor,
    )
    .unwrap();

    assert!(summary.fully_successful());
    assert!(out_dir.is_dir());

    let calls = executor.calls.borrow();
    assert_eq!(calls.len(), 1);
    assert_eq!(
        calls[0].1,
        out_dir.join(format!("{OUTPUT_PREFIX}photo.jpg"))
    );
}

#[test]
fn eligibility_filter_is_case_insensitive_and_sorted() {
    let dir = test_dir("filter");
    for name in ["b.PNG", "a.jpg", "c.JPeG", "d.txt", "e.gif", "noext"] {
        touch(&dir, name);
    }

    let files: Vec<_> = eligible_files(&dir)
        .unwrap()
        .into_iter()
        .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
        .collect();
    assert_eq!(files, vec!["a.jpg", "b.PNG", "c.JPeG"]);
}

#[test]
fn empty_input_folder_is_a_config_error() {
    let dir = test_dir("empty");
    touch(&dir, "notes.txt");

    let probe = FakeProbe { fail_on: None };
    let executor = RecordingExecutor::default();

    let err = run_batch(
        &dir,
        &dir.join("out"),
        wm(),
        Path::new("wm.png"),
        &ScalePolicy::PercentOfCanvasWidth { percent: 10.0 },
        &spread(2),
        &probe,
        &executor,
    )
    .unwrap_err();
    assert!(matches!(err, FiligreeError::Config(_)));
    assert!(executor.calls.borrow().is_empty());
}

#[test]
fn missing_input_folder_surfaces_as_an_error() {
    let dir = PathBuf::from("target")
        .join("batch_tests")
        .join("does_not_exist");
    let _ = std::fs::remove_dir_all(&dir);

    let probe = FakeProbe { fail_on: None };
    let executor = RecordingExecutor::default();

    let result = run_batch(
        &dir,
        &dir.join("out"),
        wm(),
        Path::new("wm.png"),
        &ScalePolicy::PercentOfCanvasWidth { percent: 10.0 },
        &spread(2),
        &probe,
        &executor,
    );
    assert!(result.is_err());
}
