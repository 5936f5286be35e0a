use std::process::Stdio;

use serde::{Deserialize, Serialize};
use tokio::process::{Child, Command};
use tracing::{error, info, warn};

#[derive(Debug, Clone, Deserialize)]
pub struct PlayerConfig {
    #[serde(default = "default_command")]
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default = "default_fullscreen_args")]
    pub fullscreen_args: Vec<String>,
}

fn default_command() -> String {
    "mpv".to_string()
}

fn default_fullscreen_args() -> Vec<String> {
    vec!["--fs".to_string()]
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            command: default_command(),
            args: Vec::new(),
            fullscreen_args: default_fullscreen_args(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayState {
    pub url: String,
    pub fullscreen: bool,
}

struct Playback {
    state: PlayState,
    child: Child,
}

/// Hands stream urls to an external media player, one process at a time.
pub struct Player {
    config: PlayerConfig,
    current: Option<Playback>,
}

impl Player {
    pub fn new(config: PlayerConfig) -> Self {
        Self {
            config,
            current: None,
        }
    }

    pub fn is_playing(&mut self) -> bool {
        match self.current.as_mut() {
            Some(playback) => matches!(playback.child.try_wait(), Ok(None)),
            None => false,
        }
    }

    pub fn current(&mut self) -> Option<PlayState> {
        if self.is_playing() {
            self.current.as_ref().map(|p| p.state.clone())
        } else {
            None
        }
    }

    /// Plays `url` verbatim. Playing the url that is already running again
    /// restarts it fullscreen.
    pub async fn play(&mut self, url: &str) -> anyhow::Result<PlayState> {
        let fullscreen = self.current().is_some_and(|state| state.url == url);
        self.stop().await;

        let mut args = self.config.args.clone();
        if fullscreen {
            args.extend(self.config.fullscreen_args.iter().cloned());
        }
        args.push(url.to_string());

        info!("Starting {} for {} (fullscreen={})", self.config.command, url, fullscreen);
        let child = Command::new(&self.config.command)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                error!("Failed to start {}: {}", self.config.command, e);
                anyhow::anyhow!("failed to start {}: {}", self.config.command, e)
            })?;

        let state = PlayState {
            url: url.to_string(),
            fullscreen,
        };
        self.current = Some(Playback {
            state: state.clone(),
            child,
        });
        Ok(state)
    }

    pub async fn stop(&mut self) {
        let Some(mut playback) = self.current.take() else {
            return;
        };
        if let Err(e) = playback.child.kill().await {
            warn!("Failed to stop player for {}: {}", playback.state.url, e);
        } else {
            info!("Stopped player for {}", playback.state.url);
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sleeper() -> PlayerConfig {
        // `sh -c 'sleep 30' player <url>` ignores the url it is handed.
        PlayerConfig {
            command: "sh".to_string(),
            args: vec!["-c".to_string(), "sleep 30".to_string(), "player".to_string()],
            fullscreen_args: vec!["--fs".to_string()],
        }
    }

    #[tokio::test]
    async fn test_replay_goes_fullscreen() {
        let mut player = Player::new(sleeper());
        let first = player.play("http://s/cnn").await.unwrap();
        assert!(!first.fullscreen);
        assert!(player.is_playing());

        let again = player.play("http://s/cnn").await.unwrap();
        assert!(again.fullscreen);

        let other = player.play("http://s/bbc").await.unwrap();
        assert!(!other.fullscreen);
        assert_eq!(player.current().unwrap().url, "http://s/bbc");

        player.stop().await;
        assert!(!player.is_playing());
        assert!(player.current().is_none());
    }

    #[tokio::test]
    async fn test_missing_player_binary() {
        let mut player = Player::new(PlayerConfig {
            command: "/nonexistent/player".to_string(),
            ..PlayerConfig::default()
        });
        assert!(player.play("http://s/cnn").await.is_err());
        assert!(!player.is_playing());
    }
}
