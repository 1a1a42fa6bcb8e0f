use crate::workflow::{parse_workflow_file, Workflow, WorkflowFormat};
use crate::CoreError;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Where deploy progress for a workflow file is written.
///
/// JSON workflows are updated in place; TOML ones get a `.state.json` sibling.
pub fn default_state_path(workflow_path: &Path) -> PathBuf {
    match WorkflowFormat::from_path(workflow_path) {
        Ok(WorkflowFormat::Json) => workflow_path.to_path_buf(),
        _ => workflow_path.with_extension("state.json"),
    }
}

/// Write the workflow as pretty JSON, atomically.
pub fn save_workflow(path: &Path, workflow: &Workflow) -> Result<(), CoreError> {
    let content = serde_json::to_string_pretty(workflow)?;

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir)?;
    let mut tmp = NamedTempFile::new_in(&dir)?;
    tmp.write_all(content.as_bytes())?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| CoreError::Io(e.error))?;
    fsync_dir(&dir)?;

    Ok(())
}

pub fn load_workflow(path: &Path) -> Result<Workflow, CoreError> {
    parse_workflow_file(path)
}

fn fsync_dir(dir: &Path) -> Result<(), std::io::Error> {
    let f = std::fs::File::open(dir)?;
    f.sync_all()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::{Action, ActionState, ActionType};

    fn sample() -> Workflow {
        let lib = Action {
            contract_name: Some("DataUri".to_owned()),
            code: Some("library DataUri {}".to_owned()),
            ..Action::new(ActionType::DeployLibrary)
        };
        Workflow::new("MyOrg", "myApp", "Quorum", vec![lib])
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wf.json");
        let mut wf = sample();
        wf.actions[0].action_state = ActionState::FailedComplete;
        wf.actions[0].error_message = Some("boom".to_owned());

        save_workflow(&path, &wf).unwrap();
        let loaded = load_workflow(&path).unwrap();
        assert_eq!(loaded, wf);
    }

    #[test]
    fn save_overwrites_without_leaving_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wf.json");
        save_workflow(&path, &sample()).unwrap();
        let mut wf = sample();
        wf.storage = Some("ipfs".to_owned());
        save_workflow(&path, &wf).unwrap();

        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
        assert_eq!(load_workflow(&path).unwrap().storage.as_deref(), Some("ipfs"));
    }

    #[test]
    fn fully_completed_workflow_still_loads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wf.json");
        let mut wf = sample();
        let mut done = wf.actions.remove(0);
        done.action_state = ActionState::Completed;
        wf.completed.insert("DataUri".to_owned(), done);

        save_workflow(&path, &wf).unwrap();
        let loaded = load_workflow(&path).unwrap();
        assert!(loaded.is_finished());
    }

    #[test]
    fn state_path_for_each_format() {
        assert_eq!(
            default_state_path(Path::new("deploy/wf.json")),
            Path::new("deploy/wf.json")
        );
        assert_eq!(
            default_state_path(Path::new("deploy/wf.toml")),
            Path::new("deploy/wf.state.json")
        );
    }
}
