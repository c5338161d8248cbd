use std::{
    path::{Path, PathBuf},
    process::Stdio,
    time::Duration,
};

use tokio::{fs, process};

use crate::errors::{BotError, BotResult, ConversionError};

/// Upper bound for a single ffmpeg invocation
const FFMPEG_TIMEOUT: Duration = Duration::from_secs(15 * 60);

/// Re-encode any media file into a streamable H.264/AAC MP4 inside `out_dir`.
pub async fn convert_to_video<P: AsRef<Path>>(file: P, out_dir: &Path) -> BotResult<PathBuf> {
    let input_path = file.as_ref();
    fs::create_dir_all(out_dir).await?;
    let output_path = move_to_new_folder(&input_path.with_extension("mp4"), out_dir);
    let output_path = if output_path == input_path {
        output_path.with_file_name(format!("converted_{}", file_name(&output_path)?))
    } else {
        output_path
    };

    let mut args: Vec<String> = vec!["-y".into(), "-i".into(), path_arg(input_path)?];
    args.extend(
        [
            "-c:v", "libx264", "-preset", "fast", "-crf", "23", "-pix_fmt", "yuv420p", "-c:a",
            "aac", "-movflags", "+faststart",
        ]
        .map(String::from),
    );
    args.push(path_arg(&output_path)?);

    run_ffmpeg(&args, FFMPEG_TIMEOUT).await?;
    ensure_output(&output_path).await?;
    Ok(output_path)
}

/// Run ffmpeg with the given arguments, killing it if it runs past `timeout`.
pub async fn run_ffmpeg(args: &[String], timeout: Duration) -> BotResult<()> {
    log::debug!("ffmpeg {}", args.join(" "));

    let child = process::Command::new("ffmpeg")
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(ConversionError::from)?;

    let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(output) => output.map_err(ConversionError::from)?,
        Err(_) => {
            return Err(BotError::external_command_error(
                "ffmpeg",
                format!("timed out after {}s", timeout.as_secs()),
            ));
        }
    };

    if !output.status.success() {
        return Err(ConversionError::FfmpegFailed(
            output.status,
            String::from_utf8_lossy(&output.stderr).into_owned(),
        )
        .into());
    }

    Ok(())
}

/// ffmpeg can exit successfully without writing anything (e.g. seeking past the end).
pub async fn ensure_output(path: &Path) -> BotResult<()> {
    match fs::metadata(path).await {
        Ok(meta) if meta.len() > 0 => Ok(()),
        _ => Err(ConversionError::EmptyOutput(path.display().to_string()).into()),
    }
}

pub fn path_arg(path: &Path) -> Result<String, ConversionError> {
    path.to_str()
        .map(str::to_owned)
        .ok_or(ConversionError::NonUtf8Path)
}

fn file_name(path: &Path) -> Result<&str, ConversionError> {
    path.file_name()
        .and_then(|n| n.to_str())
        .ok_or(ConversionError::NonUtf8Path)
}

fn move_to_new_folder(path: &Path, new_folder: &Path) -> PathBuf {
    let filename = match path.file_name() {
        Some(name) => name,
        None => return new_folder.to_path_buf(),
    };

    new_folder.join(filename)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_lands_in_target_folder() {
        let moved = move_to_new_folder(Path::new("work/in/clip.mp4"), Path::new("work/out"));
        assert_eq!(moved, PathBuf::from("work/out/clip.mp4"));
        assert_eq!(move_to_new_folder(Path::new("/"), Path::new("out")), PathBuf::from("out"));
    }

    #[tokio::test]
    async fn missing_output_is_reported() {
        let err = ensure_output(Path::new("definitely/missing/file.jpg"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            BotError::Conversion(ConversionError::EmptyOutput(_))
        ));
    }
}
