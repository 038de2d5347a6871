mod test_heartbeat_ack;
mod test_media_ready_broadcast;
mod test_offer_not_echoed;
mod test_scan_alone_is_silent;
mod test_scan_validation;
mod test_two_party_signal_flow;
