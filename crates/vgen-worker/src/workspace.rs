//! Job-scoped artifact layout.
//!
//! Every file a job writes lives under `<work_dir>/<job_id>/` with a fixed
//! name, so a redelivered job overwrites its own earlier outputs.

use std::path::{Path, PathBuf};

use vgen_media::AssemblyPaths;
use vgen_models::JobId;

#[derive(Debug, Clone)]
pub struct JobWorkspace {
    dir: PathBuf,
}

impl JobWorkspace {
    pub fn new(work_dir: impl AsRef<Path>, job_id: &JobId) -> Self {
        Self {
            dir: work_dir.as_ref().join(job_id.as_str()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn clips_dir(&self) -> PathBuf {
        self.dir.join("clips")
    }

    pub fn audio(&self) -> PathBuf {
        self.dir.join("narration.mp3")
    }

    pub fn subtitles(&self) -> PathBuf {
        self.dir.join("subtitles.srt")
    }

    pub fn script(&self) -> PathBuf {
        self.dir.join("script.json")
    }

    pub fn clip(&self, index: u32) -> PathBuf {
        self.clips_dir().join(format!("clip_{:03}.mp4", index))
    }

    /// Downloaded still for a cue, rendered into [`Self::clip`].
    pub fn image(&self, index: u32) -> PathBuf {
        self.clips_dir().join(format!("image_{:03}.png", index))
    }

    pub fn assembly(&self) -> AssemblyPaths {
        AssemblyPaths::new(&self.dir)
    }

    /// Create the job and clip directories.
    pub async fn prepare(&self) -> std::io::Result<()> {
        tokio::fs::create_dir_all(self.clips_dir()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_are_scoped_by_job() {
        let ws = JobWorkspace::new("/work", &JobId::from_string("abc"));
        assert_eq!(ws.dir(), Path::new("/work/abc"));
        assert_eq!(ws.clip(2), PathBuf::from("/work/abc/clips/clip_002.mp4"));
        assert_eq!(ws.assembly().final_video(), PathBuf::from("/work/abc/final.mp4"));

        let other = JobWorkspace::new("/work", &JobId::from_string("xyz"));
        assert_ne!(ws.audio(), other.audio());
    }
}
