use bytes::Bytes;

use crate::codec::RespFrame;

/// An outgoing Redis command with name and arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    pub name: String,     // uppercase command name
    pub args: Vec<Bytes>, // arguments (raw bytes)
}

impl Command {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_uppercase(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<Bytes>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn ping() -> Self {
        Self::new("PING")
    }

    pub fn info(section: &str) -> Self {
        Self::new("INFO").arg(section.to_string())
    }

    /// `REPLICAOF host port`, or `REPLICAOF NO ONE` to detach.
    pub fn replicaof(target: Option<(&str, u16)>) -> Self {
        match target {
            Some((host, port)) => Self::new("REPLICAOF")
                .arg(host.to_string())
                .arg(port.to_string()),
            None => Self::new("REPLICAOF").arg("NO").arg("ONE"),
        }
    }

    /// Encode as a RESP array of bulk strings.
    pub fn into_frame(self) -> RespFrame {
        let mut items = Vec::with_capacity(1 + self.args.len());
        items.push(RespFrame::BulkString(Bytes::from(self.name)));
        items.extend(self.args.into_iter().map(RespFrame::BulkString));
        RespFrame::Array(items)
    }
}

/// Look up `field` in an `INFO` reply body (`key:value` lines, `#` section headers).
pub fn info_field<'a>(info: &'a str, field: &str) -> Option<&'a str> {
    info.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once(':'))
        .find(|(key, _)| *key == field)
        .map(|(_, value)| value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_replicaof_target() {
        let frame = Command::replicaof(Some(("10.0.0.2", 6380))).into_frame();
        assert_eq!(
            frame,
            RespFrame::Array(vec![
                RespFrame::bulk_string("REPLICAOF"),
                RespFrame::bulk_string("10.0.0.2"),
                RespFrame::bulk_string("6380"),
            ])
        );
    }

    #[test]
    fn test_build_replicaof_no_one() {
        let cmd = Command::replicaof(None);
        assert_eq!(cmd.name, "REPLICAOF");
        assert_eq!(cmd.args, vec![Bytes::from("NO"), Bytes::from("ONE")]);
    }

    #[test]
    fn test_command_name_uppercased() {
        let cmd = Command::new("info").arg("replication");
        assert_eq!(cmd.name, "INFO");
        assert_eq!(cmd, Command::info("replication"));
    }

    #[test]
    fn test_info_field() {
        let info = "# Replication\r\nrole:slave\r\nmaster_host:10.0.0.1\r\nmaster_port:6379\r\n";
        assert_eq!(info_field(info, "role"), Some("slave"));
        assert_eq!(info_field(info, "master_port"), Some("6379"));
        assert_eq!(info_field(info, "connected_slaves"), None);
    }

    #[test]
    fn test_info_field_ignores_headers() {
        assert_eq!(info_field("# role:master\n", "# role"), None);
        assert_eq!(info_field("", "role"), None);
    }
}
