// ABOUTME: Host control commands issued by the glue layer
// ABOUTME: Text parsing rejects malformed input before it reaches the metronome

use crate::error::Error;
use std::str::FromStr;

/// A local mutation the host applies and broadcasts
#[derive(Debug, Clone, PartialEq)]
pub enum Control {
    /// `tempo <bpm>`
    SetTempo(f64),
    /// `play` or `stop`
    SetPlaying(bool),
    /// `toggle`
    TogglePlay,
    /// `sig <beats>`
    SetTimeSignature(u32),
    /// `sub <1|2|4>`
    SetSubdivision(u32),
    /// `accent on|off`
    SetAccent(bool),
    /// `sound <id>`
    SetSound(String),
    /// `reset`
    Reset,
    /// Close the room
    Leave,
}

fn parse_number<T: FromStr>(command: &str, arg: Option<&str>) -> Result<T, Error> {
    let arg = arg.ok_or_else(|| Error::InvalidParameter(format!("{command} needs a value")))?;
    arg.parse()
        .map_err(|_| Error::InvalidParameter(format!("{command}: '{arg}' is not a number")))
}

fn parse_switch(command: &str, arg: Option<&str>) -> Result<bool, Error> {
    match arg {
        Some("on" | "true" | "1") => Ok(true),
        Some("off" | "false" | "0") => Ok(false),
        other => Err(Error::InvalidParameter(format!(
            "{command} expects on/off, got {:?}",
            other.unwrap_or("")
        ))),
    }
}

impl FromStr for Control {
    type Err = Error;

    /// Parse commands such as `tempo 96`, `play`, `sig 3`, `sub 2`,
    /// `accent off`, `sound wood`, `reset`, `leave`
    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let command = words.next().unwrap_or("");
        let arg = words.next();

        match command {
            "tempo" | "bpm" => Ok(Control::SetTempo(parse_number(command, arg)?)),
            "play" | "start" => Ok(Control::SetPlaying(true)),
            "stop" | "pause" => Ok(Control::SetPlaying(false)),
            "toggle" => Ok(Control::TogglePlay),
            "sig" | "time" => Ok(Control::SetTimeSignature(parse_number(command, arg)?)),
            "sub" | "subdivision" => Ok(Control::SetSubdivision(parse_number(command, arg)?)),
            "accent" => Ok(Control::SetAccent(parse_switch(command, arg)?)),
            "sound" => arg
                .map(|id| Control::SetSound(id.to_string()))
                .ok_or_else(|| Error::InvalidParameter("sound needs a sound set id".to_string())),
            "reset" => Ok(Control::Reset),
            "leave" | "quit" => Ok(Control::Leave),
            "" => Err(Error::InvalidParameter("empty command".to_string())),
            other => Err(Error::InvalidParameter(format!("unknown command '{other}'"))),
        }
    }
}
