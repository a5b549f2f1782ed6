//! # Wire messages of the channel service
//!
//! Protobuf messages and gRPC client of `com.terraquantum.channel.v1alpha1.ChannelService`,
//! generated from `proto/com/terraquantum/channel/v1alpha1/channel.proto`. These are low-level
//! types. Use [`protocol`](crate::protocol) for the typed message model.

#![allow(missing_docs)]
#![allow(clippy::all)]

tonic::include_proto!("com.terraquantum.channel.v1alpha1");

/// gRPC client of the channel service over a tonic connection.
pub type ChannelServiceClient =
    channel_service_client::ChannelServiceClient<tonic::transport::Channel>;

#[cfg(test)]
mod tests {
    use prost::Message;

    use super::*;

    #[test]
    fn field_tags_follow_the_service_schema() {
        let message = ChannelMessageProto {
            sequential_message_id: 1,
            timestamp: None,
            data: Some(channel_message_proto::Data::AcknowledgeData(
                AcknowledgeDataProto { id: 2 },
            )),
        };

        // field 1 varint, field 5 length-delimited holding field 1 varint
        assert_eq!(message.encode_to_vec(), vec![0x08, 0x01, 0x2a, 0x02, 0x08, 0x02]);
    }

    #[test]
    fn completion_is_an_empty_submessage() {
        let message = ChannelMessageProto {
            sequential_message_id: 0,
            timestamp: None,
            data: Some(channel_message_proto::Data::CompletionData(
                CompletionDataProto {},
            )),
        };

        assert_eq!(message.encode_to_vec(), vec![0x32, 0x00]);
    }
}
