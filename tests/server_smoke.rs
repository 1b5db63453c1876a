use std::sync::Arc;

use axum_test::TestServer;
use qbwc_adapters::InMemoryRecordSink;
use qbwc_bridge::app::build_engine;
use qbwc_bridge::ServerConfig;
use qbwc_core::{InMemoryIteratorStore, InMemoryTicketStore};
use qbwc_soap::create_router;

fn config() -> ServerConfig {
    ServerConfig::from_lookup(|key| match key {
                                  "QBWC_USERNAME" => Some("sync".into()),
                                  "QBWC_PASSWORD" => Some("secret".into()),
                                  "QBWC_COMPANY_FILE" => Some("C:\\Company.qbw".into()),
                                  "QBWC_SOAP_PATH" => Some("/qbwc".into()),
                                  _ => None,
                              }).expect("config")
}

fn envelope(inner: &str) -> String {
    format!("<?xml version=\"1.0\" encoding=\"utf-8\"?><soap:Envelope \
             xmlns:soap=\"http://schemas.xmlsoap.org/soap/envelope/\"><soap:Body>{inner}</soap:Body></soap:Envelope>")
}

fn server(sink: Arc<InMemoryRecordSink>) -> TestServer {
    let cfg = config();
    let engine = build_engine(&cfg,
                              Arc::new(InMemoryTicketStore::new()),
                              Arc::new(InMemoryIteratorStore::new()),
                              sink).expect("engine");
    TestServer::new(create_router(Arc::new(engine), &cfg.soap_path)).expect("server")
}

fn ticket_of(body: &str) -> String {
    let start = body.find("<string>").expect("ticket") + "<string>".len();
    body[start..start + body[start..].find("</string>").expect("end")].to_string()
}

#[tokio::test]
async fn server_version_answers() {
    let server = server(Arc::new(InMemoryRecordSink::new()));
    let rs = server.post("/qbwc")
                   .text(envelope("<serverVersion xmlns=\"http://developer.intuit.com/\" />"))
                   .await;
    rs.assert_status_ok();
    assert!(rs.text().contains("<serverVersionResult>"));
}

#[tokio::test]
async fn customers_are_stored_and_next_step_starts() {
    let sink = Arc::new(InMemoryRecordSink::new());
    let server = server(sink.clone());

    let auth = server.post("/qbwc")
                     .text(envelope("<authenticate xmlns=\"http://developer.intuit.com/\"><strUserName>sync</strUserName>\
                                     <strPassword>secret</strPassword></authenticate>"))
                     .await;
    let body = auth.text();
    assert!(body.contains("C:\\Company.qbw"));
    let ticket = ticket_of(&body);

    let send = server.post("/qbwc")
                     .text(envelope(&format!("<sendRequestXML xmlns=\"http://developer.intuit.com/\"><ticket>{ticket}</ticket>\
                                              <strHCPResponse></strHCPResponse><strCompanyFileName></strCompanyFileName>\
                                              <qbXMLCountry>US</qbXMLCountry><qbXMLMajorVers>13</qbXMLMajorVers>\
                                              <qbXMLMinorVers>0</qbXMLMinorVers></sendRequestXML>")))
                     .await;
    assert!(send.text().contains("CustomerQueryRq"));

    let page = "<?xml version=\"1.0\" ?><QBXML><QBXMLMsgsRs><CustomerQueryRs requestID=\"1\" statusCode=\"0\" \
                statusSeverity=\"Info\" statusMessage=\"Status OK\"><CustomerRet><ListID>80000001</ListID>\
                </CustomerRet></CustomerQueryRs></QBXMLMsgsRs></QBXML>";
    let escaped = page.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;").replace('"', "&quot;");
    let recv = server.post("/qbwc")
                     .text(envelope(&format!("<receiveResponseXML xmlns=\"http://developer.intuit.com/\"><ticket>{ticket}</ticket>\
                                              <response>{escaped}</response><hresult></hresult><message></message>\
                                              </receiveResponseXML>")))
                     .await;
    // Primer step de tres terminado: 100/3.
    assert!(recv.text().contains("<receiveResponseXMLResult>33</receiveResponseXMLResult>"));
    assert_eq!(sink.count("CustomerQuery"), 1);
}
